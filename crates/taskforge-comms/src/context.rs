use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Concurrent key/value store for cross-agent state.
///
/// Last-writer-wins: values are installed by atomic reference replacement, so
/// a reader never observes a torn value, only a possibly-stale one. This is
/// deliberately not a transactional store. Lock critical sections never span
/// an await, so the store is safe to share across concurrent pipelines.
pub struct SharedContext {
    data: RwLock<HashMap<String, Arc<serde_json::Value>>>,
}

impl SharedContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Installs `value` under `key`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.data.write().insert(key.into(), Arc::new(value));
    }

    /// Returns the current value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.read().get(key).map(|v| v.as_ref().clone())
    }

    /// Returns the current value for `key`, or `default` when absent. Never
    /// errors on a missing key.
    pub fn get_or(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        self.get(key).unwrap_or(default)
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Returns a snapshot of all entries.
    pub fn get_all(&self) -> HashMap<String, serde_json::Value> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.as_ref().clone()))
            .collect()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the context holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}
