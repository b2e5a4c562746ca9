//! Error types for azdo-tools.

use thiserror::Error;

/// Main error type for azdo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failed (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token lacks permission for the operation (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Work item or endpoint does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned any other non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response or input did not have the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map an HTTP status code and response body to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }
}

/// Result type alias for azdo operations.
pub type Result<T> = std::result::Result<T, Error>;
