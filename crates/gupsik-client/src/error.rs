//! Error types for the gupsik client.
//!
//! None of these are fatal to the process. The application turns them into
//! [`Notice`](crate::app::Notice)s and keeps running with a degraded view.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP call failed or returned a non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// WebSocket connect or transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Local like cap reached; nothing was sent
    #[error("Reaction limit reached for {school_code} on {date}")]
    RateLimitExceeded { date: String, school_code: String },

    /// Push payload could not be understood
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Local storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(e.to_string())
    }
}

impl From<gupsik_board::Error> for Error {
    fn from(e: gupsik_board::Error) -> Self {
        Error::InvalidInput(e.to_string())
    }
}
