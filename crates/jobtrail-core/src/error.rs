//! Error types for jobtrail.

use thiserror::Error;

/// Result type alias using jobtrail's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for jobtrail operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Thread not found for a user
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    /// AI extraction/parsing failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Vector index operation failed (non-fatal for ingestion)
    #[error("Index error: {0}")]
    Index(String),

    /// Mail-provider API failure
    #[error("Mail provider error: {0}")]
    Mail(String),

    /// Mail-provider bearer token expired (upstream 401)
    ///
    /// Surfaced distinctly from `Mail` so callers can prompt
    /// re-authentication instead of retrying.
    #[error("Mail provider token expired")]
    TokenExpired,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (malformed payload, missing required fields)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Request deadline exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication failed (shared secret mismatch, unknown sender)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// True when a bulk scan must abort instead of continuing with the
    /// remaining messages (authentication failures only).
    pub fn aborts_scan(&self) -> bool {
        matches!(self, Error::TokenExpired | Error::Unauthorized(_))
    }
}
