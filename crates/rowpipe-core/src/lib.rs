//! rowpipe Core Types
//!
//! Shared data types for the rowpipe ingestion pipeline.
//!
//! ## Modules
//! - **record**: `Record` and the `<key>:<value>` datagram decoder
//! - **batch**: `Batch`, the sealed group of records handed to a commit
//! - **error**: `DecodeError`, the malformed-record failure class
//!
//! ## Example
//! ```
//! use bytes::Bytes;
//! use rowpipe_core::Record;
//!
//! let record = Record::decode(Bytes::from_static(b"alice:hello")).unwrap();
//! assert_eq!(&record.key[..], b"alice");
//! assert_eq!(&record.value[..], b"hello");
//! ```

pub mod batch;
pub mod error;
pub mod record;

pub use batch::{Batch, FlushReason};
pub use error::{DecodeError, Result};
pub use record::{Record, FIELD_SEPARATOR, MAX_DATAGRAM_SIZE};
