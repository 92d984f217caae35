//! rowpipe Ingest
//!
//! The datagram-to-storage path: a UDP `Listener` feeds a `Router`, which
//! spreads records over a fixed set of lanes. Each `LaneBuffer` seals batches
//! by size or by idle time and hands them to the `CommitExecutor`, which
//! writes them through a pooled storage connection with bounded retries.
//!
//! Delivery is at-most-once: a batch that exhausts its retries is logged and
//! dropped, and nothing is drained on shutdown.
//!
//! # Example
//!
//! ```ignore
//! let stats = IngestStats::new();
//! let pool = Arc::new(ConnectionPool::connect(1000, &factory).await?);
//!
//! let pipeline = Pipeline::start(PipelineConfig::default(), pool, stats.clone())?;
//! let listener = Listener::bind("0.0.0.0:9090".parse()?, stats.clone()).await?;
//! tokio::spawn(listener.run(pipeline.router()));
//! ```

pub mod committer;
pub mod error;
pub mod lane;
pub mod listener;
pub mod pipeline;
pub mod router;
pub mod stats;

pub use committer::{CommitConfig, CommitExecutor, CommitOutcome};
pub use error::{IngestError, Result};
pub use lane::{BatchSink, LaneBuffer};
pub use listener::Listener;
pub use pipeline::{Pipeline, PipelineConfig};
pub use router::{LaneSelector, Router};
pub use stats::{spawn_reporter, IngestStats, StatsSnapshot};
