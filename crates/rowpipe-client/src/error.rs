//! Error types for rowpipe storage client operations.
//!
//! ## Error Handling Strategy
//!
//! The commit path does not classify storage errors: every write failure is
//! retried the same way (see `retry`). The variants below exist for logging
//! and for the startup path, where `PoolInit` is fatal.

use thiserror::Error;

/// Convenience type alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not establish a connection to the storage service.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The write request failed in transport (timeout, reset, DNS, ...).
    #[error("Request error: {0}")]
    Request(String),

    /// The storage service answered with a non-success status.
    #[error("Storage returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The storage service rejected the write (in-memory client).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Building the request body failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pool could not be fully populated at startup.
    #[error("Connection pool initialization failed after {created}/{size} connections: {source}")]
    PoolInit {
        created: usize,
        size: usize,
        #[source]
        source: Box<ClientError>,
    },

    /// No connection could be checked out of the pool.
    #[error("Connection pool unavailable")]
    PoolUnavailable,
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}
