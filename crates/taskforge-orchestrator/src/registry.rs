use parking_lot::RwLock;
use std::collections::HashMap;
use taskforge_core::AgentDescriptor;
use tracing::{info, warn};

/// Generic in-memory descriptor store for tools and other resources.
///
/// Registration overwrites silently; unregistering an absent id is a logged
/// no-op, not an error.
pub struct InMemoryRegistry {
    resources: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or replaces) a resource descriptor under `id`.
    pub fn register(&self, id: impl Into<String>, metadata: serde_json::Value) {
        let id = id.into();
        self.resources.write().insert(id.clone(), metadata);
        info!(resource = %id, "registered resource");
    }

    /// Removes the resource under `id`. Logs a warning when absent.
    pub fn unregister(&self, id: &str) {
        if self.resources.write().remove(id).is_some() {
            info!(resource = %id, "unregistered resource");
        } else {
            warn!(resource = %id, "attempted to unregister unknown resource");
        }
    }

    /// Returns the metadata stored under `id`, if any.
    pub fn get(&self, id: &str) -> Option<serde_json::Value> {
        self.resources.read().get(id).cloned()
    }

    /// Returns every `(id, metadata)` pair whose metadata contains all of the
    /// query's key/value pairs.
    pub fn query(
        &self,
        query: &serde_json::Map<String, serde_json::Value>,
    ) -> Vec<(String, serde_json::Value)> {
        self.resources
            .read()
            .iter()
            .filter(|(_, metadata)| {
                query
                    .iter()
                    .all(|(k, v)| metadata.get(k).is_some_and(|m| m == v))
            })
            .map(|(id, metadata)| (id.clone(), metadata.clone()))
            .collect()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability-aware registry of worker agent descriptors.
///
/// The descriptor (capability set included) is immutable after registration;
/// re-registering the same `agent_id` replaces it wholesale.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentDescriptor>>,
}

impl AgentRegistry {
    /// Creates an empty agent registry.
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or replaces) an agent descriptor.
    pub fn register(&self, descriptor: AgentDescriptor) {
        let id = descriptor.agent_id.clone();
        self.agents.write().insert(id.clone(), descriptor);
        info!(agent = %id, "registered agent");
    }

    /// Removes the descriptor under `agent_id`. Logs a warning when absent.
    pub fn unregister(&self, agent_id: &str) {
        if self.agents.write().remove(agent_id).is_some() {
            info!(agent = %agent_id, "unregistered agent");
        } else {
            warn!(agent = %agent_id, "attempted to unregister unknown agent");
        }
    }

    /// Returns the descriptor for `agent_id`, if registered.
    pub fn get(&self, agent_id: &str) -> Option<AgentDescriptor> {
        self.agents.read().get(agent_id).cloned()
    }

    /// Returns every agent carrying the given capability tag.
    pub fn query_by_capability(&self, capability: &str) -> Vec<AgentDescriptor> {
        let mut matches: Vec<AgentDescriptor> = self
            .agents
            .read()
            .values()
            .filter(|d| d.capabilities.iter().any(|c| c == capability))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        matches
    }

    /// Returns all registered descriptors, ordered by agent id.
    pub fn snapshot(&self) -> Vec<AgentDescriptor> {
        let mut all: Vec<AgentDescriptor> = self.agents.read().values().cloned().collect();
        all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        all
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    /// Whether any agents are registered.
    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
