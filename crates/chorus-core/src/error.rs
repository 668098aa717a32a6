use thiserror::Error;

/// Top-level error type for Chorus.
#[derive(Debug, Error)]
pub enum ChorusError {
    /// A generation backend failed, timed out, or returned nothing usable.
    #[error("generation error: {0}")]
    Generation(String),

    /// Configuration error (bad participant setup, unreadable config file).
    #[error("config error: {0}")]
    Config(String),

    /// A message that cannot be ingested (empty content, unknown author).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// No participant with this id is registered.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    /// The orchestrator is tearing down and accepts no more work.
    #[error("orchestrator is shutting down")]
    ShuttingDown,

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
