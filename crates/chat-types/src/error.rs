use thiserror::Error;
use crate::thread::RunStatus;

#[derive(Error, Debug, Clone)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to create thread: {0}")]
    SessionCreation(String),

    #[error("Failed to start run: {0}")]
    RunSubmission(String),

    #[error("Run {status}: {message}")]
    RunExecution { status: RunStatus, message: String },

    #[error("Unexpected response shape: {0}")]
    ResponseParse(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Run did not finish after {0} polls")]
    PollExhausted(u32),

    #[error("Cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
