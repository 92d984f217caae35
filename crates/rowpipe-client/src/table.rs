//! Storage capability consumed by the commit path.
//!
//! The storage service is reached through a single operation: a multi-row
//! write of `(row, family, qualifier, value)` cells into one table. Writes
//! are idempotent upserts, so re-applying the same `Put`s after a failure is
//! safe.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// One cell of a row mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnValue {
    pub family: Bytes,
    pub qualifier: Bytes,
    pub value: Bytes,
}

/// A row mutation: every cell in `columns` is written under `row`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    pub row: Bytes,
    pub columns: Vec<ColumnValue>,
}

impl Put {
    /// A put writing exactly one cell.
    pub fn single(
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            row: row.into(),
            columns: vec![ColumnValue {
                family: family.into(),
                qualifier: qualifier.into(),
                value: value.into(),
            }],
        }
    }
}

/// A live handle to the storage service.
#[async_trait]
pub trait TableClient: Send + Sync + 'static {
    /// Write all `puts` into `table` in one call.
    async fn put_multiple(&self, table: &str, puts: &[Put]) -> Result<()>;
}

/// Creates storage connections for the pool at startup.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Client: TableClient;

    async fn connect(&self) -> Result<Self::Client>;
}
