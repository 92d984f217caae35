//! rowpipe Client - Storage Access for the Commit Path
//!
//! This crate provides everything the commit path needs to talk to the
//! tabular storage service:
//!
//! - **table**: the `TableClient` capability (one multi-row write) and the
//!   `Put` write shape
//! - **rest**: `RestTableClient`, an HBase REST gateway implementation
//! - **memory**: `MemoryTableClient`, an in-process table with failure injection
//! - **connection_pool**: a fixed-size pool of pre-established clients
//! - **retry**: fixed-backoff retry that treats every error as retryable
//!
//! # Example
//!
//! ```ignore
//! use rowpipe_client::{ConnectionPool, RestConfig, RestConnectionFactory, Put};
//!
//! let factory = RestConnectionFactory::new(RestConfig::new("127.0.0.1", 8080));
//! let pool = ConnectionPool::connect(1000, &factory).await?;
//!
//! let conn = pool.acquire().await?;
//! conn.put_multiple("hbase_test", &[Put::single("alice", "name", "info", "hello")]).await?;
//! // connection returns to the pool when `conn` is dropped
//! ```

pub mod connection_pool;
pub mod error;
pub mod memory;
pub mod rest;
pub mod retry;
pub mod table;

pub use connection_pool::{ConnectionPool, PoolStats, PooledConnection};
pub use error::{ClientError, Result};
pub use memory::{MemoryConnectionFactory, MemoryStore, MemoryTableClient};
pub use rest::{RestConfig, RestConnectionFactory, RestTableClient};
pub use retry::{retry_with_fixed_backoff, RetryError, RetryPolicy};
pub use table::{ColumnValue, ConnectionFactory, Put, TableClient};
