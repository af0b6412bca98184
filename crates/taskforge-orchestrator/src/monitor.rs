use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use taskforge_core::{AgentDescriptor, AgentStatus, Task, TaskStatus};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Async callback invoked with the post-update task snapshot.
pub type TaskCallback = Arc<dyn Fn(Task) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle identifying a registered task callback, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(Uuid);

impl CallbackId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Partial update merged into a tracked task record. `None` fields leave the
/// record untouched; `error` appends to the task's error list.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New lifecycle status.
    pub status: Option<TaskStatus>,
    /// Agent the task was allocated to.
    pub assigned_agent: Option<String>,
    /// Result payload returned by the agent.
    pub result: Option<serde_json::Value>,
    /// Error to append to the task's error list.
    pub error: Option<String>,
    /// Dispatch timestamp.
    pub start_time: Option<DateTime<Utc>>,
    /// Terminal timestamp.
    pub end_time: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status field.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the assigned agent field.
    pub fn with_assigned_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_agent = Some(agent_id.into());
        self
    }

    /// Sets the result field.
    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Sets the error to append.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the start timestamp.
    pub fn with_start_time(mut self, at: DateTime<Utc>) -> Self {
        self.start_time = Some(at);
        self
    }

    /// Sets the end timestamp.
    pub fn with_end_time(mut self, at: DateTime<Utc>) -> Self {
        self.end_time = Some(at);
        self
    }
}

/// Tracked state of a registered agent.
#[derive(Debug, Clone)]
pub struct AgentRecord {
    /// The agent's registration metadata.
    pub descriptor: AgentDescriptor,
    /// Scheduling status.
    pub status: AgentStatus,
    /// Ids of the tasks currently allocated to this agent.
    pub current_tasks: Vec<String>,
    /// Ids of the tasks this agent has finished.
    pub completed_tasks: Vec<String>,
    /// Timestamp of the most recent update.
    pub last_update: Option<DateTime<Utc>>,
}

/// Partial update merged into a tracked agent record. `completed_task`
/// appends to the agent's completed list.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    /// New scheduling status.
    pub status: Option<AgentStatus>,
    /// Replacement for the agent's current task list.
    pub current_tasks: Option<Vec<String>>,
    /// Task id to append to the completed list.
    pub completed_task: Option<String>,
}

impl AgentUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status field.
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the current task list.
    pub fn with_current_tasks(mut self, tasks: Vec<String>) -> Self {
        self.current_tasks = Some(tasks);
        self
    }

    /// Appends a completed task id.
    pub fn with_completed_task(mut self, task_id: impl Into<String>) -> Self {
        self.completed_task = Some(task_id.into());
        self
    }
}

/// Tracks task and agent status across all in-flight executions and fires
/// registered callbacks on task updates.
pub struct ProgressMonitor {
    tasks: RwLock<HashMap<String, Task>>,
    agents: RwLock<HashMap<String, AgentRecord>>,
    callbacks: RwLock<HashMap<String, Vec<(CallbackId, TaskCallback)>>>,
}

impl ProgressMonitor {
    /// Creates an empty monitor.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            agents: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a task for monitoring.
    pub async fn register_task(&self, task: Task) {
        self.tasks.write().await.insert(task.task_id.clone(), task);
    }

    /// Registers an agent for monitoring with an idle record.
    pub async fn register_agent(&self, descriptor: AgentDescriptor) {
        let record = AgentRecord {
            status: AgentStatus::Idle,
            current_tasks: Vec::new(),
            completed_tasks: Vec::new(),
            last_update: None,
            descriptor,
        };
        self.agents
            .write()
            .await
            .insert(record.descriptor.agent_id.clone(), record);
    }

    /// Merges a partial update into a task record, then fires every callback
    /// registered for that task with the post-update snapshot.
    ///
    /// Callbacks run as spawned tasks (fire-and-forget): they are not
    /// guaranteed to have run by the time this call returns. Updating an
    /// unknown task id logs a warning and is a no-op.
    pub async fn update_task(&self, task_id: &str, update: TaskUpdate) {
        let snapshot = {
            let mut tasks = self.tasks.write().await;
            let Some(task) = tasks.get_mut(task_id) else {
                warn!(task = %task_id, "attempted to update unknown task");
                return;
            };
            if let Some(status) = update.status {
                task.status = status;
            }
            if let Some(agent) = update.assigned_agent {
                task.assigned_agent = Some(agent);
            }
            if let Some(result) = update.result {
                task.result = Some(result);
            }
            if let Some(error) = update.error {
                task.errors.push(error);
            }
            if let Some(at) = update.start_time {
                task.start_time = Some(at);
            }
            if let Some(at) = update.end_time {
                task.end_time = Some(at);
            }
            task.clone()
        };

        let callbacks = self.callbacks.read().await;
        if let Some(registered) = callbacks.get(task_id) {
            for (_, callback) in registered {
                let callback = callback.clone();
                let snapshot = snapshot.clone();
                tokio::spawn(async move {
                    callback(snapshot).await;
                });
            }
        }
    }

    /// Merges a partial update into an agent record. Updating an unknown
    /// agent id logs a warning and is a no-op.
    pub async fn update_agent(&self, agent_id: &str, update: AgentUpdate) {
        let mut agents = self.agents.write().await;
        let Some(record) = agents.get_mut(agent_id) else {
            warn!(agent = %agent_id, "attempted to update unknown agent");
            return;
        };
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(current) = update.current_tasks {
            record.current_tasks = current;
        }
        if let Some(completed) = update.completed_task {
            record.current_tasks.retain(|t| t != &completed);
            record.completed_tasks.push(completed);
        }
        record.last_update = Some(Utc::now());
    }

    /// Returns a snapshot of one task, if tracked.
    pub async fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Returns a snapshot of one agent record, if tracked.
    pub async fn agent(&self, agent_id: &str) -> Option<AgentRecord> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// Returns a snapshot of all tracked tasks.
    pub async fn all_tasks(&self) -> HashMap<String, Task> {
        self.tasks.read().await.clone()
    }

    /// Returns a snapshot of all tracked agents.
    pub async fn all_agents(&self) -> HashMap<String, AgentRecord> {
        self.agents.read().await.clone()
    }

    /// Registers a callback fired after each update of `task_id`. Returns a
    /// handle for [`ProgressMonitor::remove_task_callback`].
    pub async fn on_task_update(&self, task_id: &str, callback: TaskCallback) -> CallbackId {
        let id = CallbackId::new();
        self.callbacks
            .write()
            .await
            .entry(task_id.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    /// Unregisters a previously registered callback.
    pub async fn remove_task_callback(&self, task_id: &str, callback_id: CallbackId) {
        let mut callbacks = self.callbacks.write().await;
        if let Some(registered) = callbacks.get_mut(task_id) {
            registered.retain(|(id, _)| *id != callback_id);
        }
    }
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskforge_core::TaskSpec;
    use tokio::sync::mpsc;

    fn sample_task(id: &str) -> Task {
        Task::from_spec(id, TaskSpec::new(id, "sample"))
    }

    #[tokio::test]
    async fn test_register_and_update_task() {
        let monitor = ProgressMonitor::new();
        monitor.register_task(sample_task("t-0")).await;

        monitor
            .update_task(
                "t-0",
                TaskUpdate::new()
                    .with_status(TaskStatus::InProgress)
                    .with_assigned_agent("research-agent")
                    .with_start_time(Utc::now()),
            )
            .await;

        let task = monitor.task("t-0").await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.assigned_agent.as_deref(), Some("research-agent"));
        assert!(task.start_time.is_some());
        // Fields not present in the update are untouched.
        assert!(task.result.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_noop() {
        let monitor = ProgressMonitor::new();
        monitor
            .update_task("ghost", TaskUpdate::new().with_status(TaskStatus::Failed))
            .await;
        assert!(monitor.task("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_errors_accumulate() {
        let monitor = ProgressMonitor::new();
        monitor.register_task(sample_task("t-0")).await;
        monitor
            .update_task("t-0", TaskUpdate::new().with_error("first"))
            .await;
        monitor
            .update_task("t-0", TaskUpdate::new().with_error("second"))
            .await;
        let task = monitor.task("t-0").await.unwrap();
        assert_eq!(task.errors, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_agent_record_lifecycle() {
        let monitor = ProgressMonitor::new();
        monitor
            .register_agent(
                AgentDescriptor::new("agent-1", "Agent One")
                    .with_capabilities(vec!["research".into()]),
            )
            .await;

        monitor
            .update_agent(
                "agent-1",
                AgentUpdate::new()
                    .with_status(AgentStatus::Assigned)
                    .with_current_tasks(vec!["t-0".into(), "t-1".into()]),
            )
            .await;

        monitor
            .update_agent("agent-1", AgentUpdate::new().with_completed_task("t-0"))
            .await;

        let record = monitor.agent("agent-1").await.unwrap();
        assert_eq!(record.status, AgentStatus::Assigned);
        assert_eq!(record.current_tasks, vec!["t-1".to_string()]);
        assert_eq!(record.completed_tasks, vec!["t-0".to_string()]);
        assert!(record.last_update.is_some());
    }

    #[tokio::test]
    async fn test_callback_observes_post_update_snapshot() {
        let monitor = ProgressMonitor::new();
        monitor.register_task(sample_task("t-0")).await;

        let (tx, mut rx) = mpsc::channel::<Task>(4);
        let callback: TaskCallback = Arc::new(move |task| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(task).await;
            })
        });
        monitor.on_task_update("t-0", callback).await;

        monitor
            .update_task(
                "t-0",
                TaskUpdate::new()
                    .with_status(TaskStatus::Completed)
                    .with_result(json!({"answer": 42})),
            )
            .await;

        let observed = rx.recv().await.unwrap();
        assert_eq!(observed.status, TaskStatus::Completed);
        assert_eq!(observed.result, Some(json!({"answer": 42})));
    }

    #[tokio::test]
    async fn test_removed_callback_no_longer_fires() {
        let monitor = ProgressMonitor::new();
        monitor.register_task(sample_task("t-0")).await;

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let callback: TaskCallback = Arc::new(move |_task| {
            let fired = fired_clone.clone();
            Box::pin(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });

        let id = monitor.on_task_update("t-0", callback).await;
        monitor.remove_task_callback("t-0", id).await;

        monitor
            .update_task("t-0", TaskUpdate::new().with_status(TaskStatus::Completed))
            .await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
