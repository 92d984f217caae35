//! Error types for the ingestion pipeline.

use std::net::SocketAddr;

use rowpipe_core::DecodeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The datagram is not a `key:value` record. It is dropped.
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] DecodeError),

    /// The lane's buffer task has exited and no longer accepts records.
    #[error("Lane {0} is closed")]
    LaneClosed(usize),

    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
