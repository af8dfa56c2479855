use std::time::Duration;
use thiserror::Error;

/// Top-level error type for georgibot.
#[derive(Debug, Error)]
pub enum GeorgiError {
    /// Transport-level failure talking to the backend (connect, non-2xx).
    #[error("provider error: {0}")]
    Provider(String),

    /// The backend did not answer within the configured timeout.
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a body we could not decode.
    #[error("decode error: {0}")]
    Decode(String),

    /// The backend answered, but with no text.
    #[error("backend returned an empty generation")]
    EmptyGeneration,

    /// The sanitized prompt exceeds the configured ceiling.
    #[error("input too long: {len} chars (max {max})")]
    InputTooLong { len: usize, max: usize },

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
