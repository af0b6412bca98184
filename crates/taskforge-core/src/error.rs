use thiserror::Error;

/// A convenience `Result` alias using [`TaskforgeError`].
pub type TaskforgeResult<T> = Result<T, TaskforgeError>;

/// Top-level error type for the Taskforge framework.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum TaskforgeError {
    /// A required collaborator is missing or misconfigured.
    #[error("Config error: {0}")]
    Config(String),

    /// The decomposition or planning collaborator failed.
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Task-to-agent allocation failed in a way that cannot be skipped.
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// An agent's processing raised an error.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An error in the message broker or delivery path.
    #[error("Broker error: {0}")]
    Broker(String),

    /// An error in the orchestration pipeline itself.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// A JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
