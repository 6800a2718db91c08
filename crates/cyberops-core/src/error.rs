use thiserror::Error;

/// A convenience `Result` alias using [`CyberopsError`].
pub type CyberopsResult<T> = Result<T, CyberopsError>;

/// Top-level error type for the cyberops orchestrator.
///
/// Task-local failures (oracle, parse, unsupported task) never abort the
/// scheduler; they end the owning task in `Failed`.
#[derive(Error, Debug)]
pub enum CyberopsError {
    /// The Decision Oracle call itself failed (transport, HTTP status, empty answer).
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// The oracle answered, but the text could not be read as the expected structure.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The concrete agent variant does not handle this task name.
    #[error("Unsupported task '{task_name}' for agent type '{agent_type}'")]
    UnsupportedTask {
        /// Agent type that rejected the task.
        agent_type: String,
        /// Rejected task name.
        task_name: String,
    },

    /// The agent cannot accept work in its current state.
    #[error("Agent unavailable: {0}")]
    AgentUnavailable(String),

    /// A task lifecycle move outside Pending→Assigned→Executing→(Completed|Failed).
    #[error("Invalid task transition from {from} to {to}")]
    InvalidTransition {
        /// Status before the attempted move.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Scheduler bookkeeping rejected a request (duplicate or non-pending task).
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// A tool execution audit record could not be updated.
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CyberopsError {
    /// Whether this error, raised while an agent executes a task, must put the
    /// agent into the sticky `Error` state.
    ///
    /// Rejections (`UnsupportedTask`, `AgentUnavailable`) are transient and
    /// leave the agent able to take the next task.
    pub fn is_agent_fault(&self) -> bool {
        !matches!(
            self,
            CyberopsError::UnsupportedTask { .. } | CyberopsError::AgentUnavailable(_)
        )
    }
}
