//! Error Types for rowpipe Records
//!
//! Decoding a datagram is the only fallible operation on core types. Every
//! variant here belongs to the "malformed record" class: the datagram is
//! dropped, logged, and never retried.

use thiserror::Error;

/// Result alias for record decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The datagram contains no `:` separator.
    #[error("Malformed record: no separator in {len}-byte datagram")]
    MissingSeparator { len: usize },

    /// The datagram starts with the separator, leaving an empty row key.
    #[error("Malformed record: empty key")]
    EmptyKey,
}
