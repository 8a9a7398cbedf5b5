use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Failures that mean the server could not be reached or answered badly
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ChatError::Network(_) | ChatError::Server { .. } | ChatError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
