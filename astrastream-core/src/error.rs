use thiserror::Error;

pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Inbound control envelope could not be decoded
    #[error("invalid inbound message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    #[error("invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    pub fn config(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            key,
            reason: reason.into(),
        }
    }
}
