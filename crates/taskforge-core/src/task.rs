use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task over its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not yet dispatched.
    Pending,
    /// Dispatched to an agent, awaiting its reply.
    InProgress,
    /// The assigned agent returned a result.
    Completed,
    /// The assigned agent failed or timed out.
    Failed,
    /// No agent could satisfy the task's required capabilities.
    Skipped,
}

impl TaskStatus {
    /// Whether this status is terminal (the task will not change again).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

/// A subtask as returned by the decomposition collaborator, before the
/// orchestrator assigns it a stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Short descriptive title, also used as a dependency reference.
    pub title: String,
    /// Detailed description of what needs to be done.
    pub description: String,
    /// Titles of other subtasks this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Capability tags an agent must carry to execute this subtask.
    #[serde(default)]
    pub required_capabilities: Vec<String>,
}

impl TaskSpec {
    /// Creates a spec with no dependencies and no capability requirements.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            dependencies: Vec::new(),
            required_capabilities: Vec::new(),
        }
    }

    /// Sets the dependency titles.
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    /// Sets the required capability tags.
    pub fn with_capabilities(mut self, caps: Vec<String>) -> Self {
        self.required_capabilities = caps;
        self
    }
}

/// A unit of decomposed work tracked through the orchestration pipeline.
///
/// Created from a [`TaskSpec`] once the orchestrator assigns the stable
/// `{execution_id}-task-{n}` id; mutated only by the orchestrator and the
/// progress monitor, never deleted during an execution's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable id assigned by the orchestrator.
    pub task_id: String,
    /// Short descriptive title.
    pub title: String,
    /// Detailed description of what needs to be done.
    pub description: String,
    /// Titles of other subtasks this one depends on.
    pub dependencies: Vec<String>,
    /// Capability tags an agent must carry to execute this task.
    pub required_capabilities: Vec<String>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// The single agent this task was allocated to, if any.
    pub assigned_agent: Option<String>,
    /// Result payload returned by the agent.
    pub result: Option<serde_json::Value>,
    /// Ordered list of errors recorded against this task.
    pub errors: Vec<String>,
    /// When the task was dispatched.
    pub start_time: Option<DateTime<Utc>>,
    /// When the task reached a terminal status.
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Builds a pending task from a decomposed spec and an assigned id.
    pub fn from_spec(task_id: impl Into<String>, spec: TaskSpec) -> Self {
        Self {
            task_id: task_id.into(),
            title: spec.title,
            description: spec.description,
            dependencies: spec.dependencies,
            required_capabilities: spec.required_capabilities,
            status: TaskStatus::Pending,
            assigned_agent: None,
            result: None,
            errors: Vec::new(),
            start_time: None,
            end_time: None,
        }
    }
}
