//! Error types for docgate.

use thiserror::Error;

/// Main error type for docgate operations.
#[derive(Error, Debug)]
pub enum DocgateError {
    /// The rate limiter was asked for a capacity of zero
    #[error("Rate limit capacity must be positive")]
    InvalidCapacity,

    /// The background replenishment task could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The document could not be encoded to (or decoded from) the wire format
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection, timeout or other HTTP transport failures
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Waiting for admission was cancelled or the limiter was shut down
    #[error("Admission cancelled")]
    Cancelled,

    /// Non-2xx response, only produced when `reject_error_status` is enabled
    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocgateError {
    /// Whether this error means the caller never got admitted.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DocgateError::Cancelled)
    }
}

/// Result type alias for docgate operations.
pub type Result<T> = std::result::Result<T, DocgateError>;
