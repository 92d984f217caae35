//! Record Data Structure
//!
//! A `Record` is one decoded datagram: a row key and an opaque value.
//!
//! ## Wire Format
//! ```text
//! <key>:<value>
//! ```
//! - The FIRST `:` is the delimiter; the value may contain more `:` bytes
//! - The key must be non-empty
//! - Bytes are kept exactly as received (no trimming, no UTF-8 requirement)
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` so decoding slices the received buffer instead of
//!   copying key and value out of it
//! - Fields are public but a `Record` is never mutated after decoding

use bytes::Bytes;

use crate::error::{DecodeError, Result};

/// Byte that separates the key from the value in a datagram.
pub const FIELD_SEPARATOR: u8 = b':';

/// Largest datagram the listener accepts, in bytes.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// A single key/value record destined for one storage row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Row key in the storage table
    pub key: Bytes,

    /// Cell value (payload)
    pub value: Bytes,
}

impl Record {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Decode a raw datagram into a record.
    ///
    /// # Errors
    ///
    /// - `MissingSeparator` if the datagram has no `:`
    /// - `EmptyKey` if the datagram starts with `:`
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use rowpipe_core::Record;
    ///
    /// let record = Record::decode(Bytes::from_static(b"a:b:c")).unwrap();
    /// assert_eq!(&record.key[..], b"a");
    /// assert_eq!(&record.value[..], b"b:c");
    /// ```
    pub fn decode(data: Bytes) -> Result<Self> {
        let split = data
            .iter()
            .position(|&b| b == FIELD_SEPARATOR)
            .ok_or(DecodeError::MissingSeparator { len: data.len() })?;

        if split == 0 {
            return Err(DecodeError::EmptyKey);
        }

        Ok(Self {
            key: data.slice(..split),
            value: data.slice(split + 1..),
        })
    }

    /// Key rendered for log output.
    pub fn key_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// Size of key plus value in bytes.
    pub fn size_bytes(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &'static str) -> Result<Record> {
        Record::decode(Bytes::from_static(s.as_bytes()))
    }

    #[test]
    fn test_decode_simple() {
        let record = decode("alice:hello").unwrap();
        assert_eq!(record.key, Bytes::from("alice"));
        assert_eq!(record.value, Bytes::from("hello"));
    }

    #[test]
    fn test_decode_value_keeps_later_separators() {
        let record = decode("a:b:c").unwrap();
        assert_eq!(record.key, Bytes::from("a"));
        assert_eq!(record.value, Bytes::from("b:c"));
    }

    #[test]
    fn test_decode_empty_value() {
        let record = decode("key:").unwrap();
        assert_eq!(record.key, Bytes::from("key"));
        assert!(record.value.is_empty());
    }

    #[test]
    fn test_decode_missing_separator() {
        let err = decode("no separator here").unwrap_err();
        assert_eq!(err, DecodeError::MissingSeparator { len: 17 });
    }

    #[test]
    fn test_decode_empty_datagram() {
        let err = decode("").unwrap_err();
        assert_eq!(err, DecodeError::MissingSeparator { len: 0 });
    }

    #[test]
    fn test_decode_empty_key() {
        assert_eq!(decode(":value").unwrap_err(), DecodeError::EmptyKey);
    }

    #[test]
    fn test_decode_keeps_trailing_newline() {
        let record = decode("sensor-7:42.5\n").unwrap();
        assert_eq!(record.value, Bytes::from("42.5\n"));
    }

    #[test]
    fn test_decode_non_utf8_bytes() {
        let raw = Bytes::from(vec![0xff, 0xfe, b':', 0x00, 0x80]);
        let record = Record::decode(raw).unwrap();
        assert_eq!(&record.key[..], &[0xff, 0xfe]);
        assert_eq!(&record.value[..], &[0x00, 0x80]);
        assert_eq!(record.key_lossy(), "\u{fffd}\u{fffd}");
    }

    #[test]
    fn test_size_bytes() {
        let record = Record::new("abc", "12345");
        assert_eq!(record.size_bytes(), 8);
    }
}
