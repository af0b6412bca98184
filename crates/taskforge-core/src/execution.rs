use crate::plan::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline state of a goal execution. Transitions are monotonic: a record in
/// a terminal state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Record created, pipeline not yet started.
    Initializing,
    /// Invoking the decomposition collaborator.
    Decomposing,
    /// Invoking the planning collaborator.
    Planning,
    /// Matching tasks to registered agents.
    Allocating,
    /// Dispatching plan steps to agents.
    Executing,
    /// Pipeline finished with a populated result.
    Completed,
    /// Pipeline aborted; the error list explains why.
    Failed,
}

impl ExecutionStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Root aggregate for one goal: tracks the pipeline state, the decomposed
/// subtask ids, the plan, and the accumulated result and errors. Retained
/// in memory for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique execution identifier.
    pub execution_id: String,
    /// The high-level goal being processed.
    pub goal: String,
    /// Caller-supplied context passed to the collaborators.
    pub context: serde_json::Value,
    /// Current pipeline state.
    pub status: ExecutionStatus,
    /// Ordered ids of the decomposed subtasks.
    pub subtasks: Vec<String>,
    /// The plan produced for this execution.
    pub plan: Option<Plan>,
    /// Accumulated step results, populated on completion.
    pub result: Option<serde_json::Value>,
    /// Errors recorded against this execution.
    pub errors: Vec<String>,
    /// When the execution record was created.
    pub start_time: DateTime<Utc>,
    /// When the execution reached a terminal state.
    pub end_time: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// Creates a fresh record in the `Initializing` state.
    pub fn new(
        execution_id: impl Into<String>,
        goal: impl Into<String>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            goal: goal.into(),
            context,
            status: ExecutionStatus::Initializing,
            subtasks: Vec::new(),
            plan: None,
            result: None,
            errors: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Moves the record forward to `status`. Returns false (and leaves the
    /// record untouched) if the record is already in a terminal state.
    pub fn advance(&mut self, status: ExecutionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Marks the execution failed, appending the error and stamping the end
    /// time. No-op if the record is already terminal.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Failed;
        self.errors.push(error.into());
        self.end_time = Some(Utc::now());
    }

    /// Marks the execution completed with the given result and stamps the
    /// end time. No-op if the record is already terminal.
    pub fn complete(&mut self, result: serde_json::Value) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Completed;
        self.result = Some(result);
        self.end_time = Some(Utc::now());
    }
}
