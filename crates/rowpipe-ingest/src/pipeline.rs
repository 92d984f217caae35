//! Pipeline assembly.
//!
//! ```text
//! Listener ──► Router ──► lane 0 ──┐
//!                    ├──► lane 1 ──┼──► CommitExecutor ──► ConnectionPool ──► storage
//!                    └──► lane N ──┘
//! ```
//!
//! `Pipeline::start` wires the lanes to a shared commit executor and returns
//! the router that feeds them. Binding the listener is left to the caller.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rowpipe_client::{ConnectionPool, RetryPolicy, TableClient};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::committer::{CommitConfig, CommitExecutor};
use crate::error::{IngestError, Result};
use crate::lane::LaneBuffer;
use crate::router::{LaneSelector, Router};
use crate::stats::IngestStats;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of lanes (default: 50)
    pub lanes: usize,

    /// Records per batch before a size flush (default: 200)
    pub batch_capacity: usize,

    /// Bounded queue depth in front of each lane (default: 1000)
    pub lane_queue_depth: usize,

    /// Quiet period after which a partial batch is flushed (default: 10s)
    pub idle_timeout: Duration,

    pub routing: LaneSelector,

    pub table: String,

    /// Column family of the single cell per row (default: "name")
    pub column_family: String,

    /// Column qualifier of the single cell per row (default: "info")
    pub column_qualifier: String,

    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lanes: 50,
            batch_capacity: 200,
            lane_queue_depth: 1000,
            idle_timeout: Duration::from_secs(10),
            routing: LaneSelector::RoundRobin,
            table: "rowpipe".to_string(),
            column_family: "name".to_string(),
            column_qualifier: "info".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("lanes", self.lanes),
            ("batch_capacity", self.batch_capacity),
            ("lane_queue_depth", self.lane_queue_depth),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(IngestError::Config(format!("{} must be at least 1", name)));
            }
        }

        if self.idle_timeout.is_zero() {
            return Err(IngestError::Config("idle_timeout must be non-zero".to_string()));
        }
        if self.table.is_empty() {
            return Err(IngestError::Config("table name must not be empty".to_string()));
        }
        if self.column_family.is_empty() {
            return Err(IngestError::Config("column family must not be empty".to_string()));
        }
        Ok(())
    }

    fn commit_config(&self) -> CommitConfig {
        CommitConfig {
            table: self.table.clone(),
            column_family: Bytes::from(self.column_family.clone()),
            column_qualifier: Bytes::from(self.column_qualifier.clone()),
            retry: self.retry.clone(),
        }
    }
}

/// Running lanes plus the router feeding them.
pub struct Pipeline {
    router: Router,
    lanes: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawn one buffer task per lane, all committing through `pool`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<C: TableClient>(
        config: PipelineConfig,
        pool: Arc<ConnectionPool<C>>,
        stats: Arc<IngestStats>,
    ) -> Result<Self> {
        config.validate()?;

        let executor = CommitExecutor::new(pool, config.commit_config(), stats.clone());

        let mut senders = Vec::with_capacity(config.lanes);
        let mut lanes = Vec::with_capacity(config.lanes);
        for lane in 0..config.lanes {
            let (tx, rx) = mpsc::channel(config.lane_queue_depth);
            let buffer = LaneBuffer::new(
                lane,
                config.batch_capacity,
                config.idle_timeout,
                rx,
                executor.clone(),
                stats.clone(),
            );
            senders.push(tx);
            lanes.push(tokio::spawn(buffer.run()));
        }

        let router = Router::new(senders, config.routing, stats)?;

        info!(
            lanes = config.lanes,
            batch_capacity = config.batch_capacity,
            lane_queue_depth = config.lane_queue_depth,
            idle_timeout_ms = config.idle_timeout.as_millis() as u64,
            routing = %config.routing,
            table = %config.table,
            "Pipeline started"
        );

        Ok(Self { router, lanes })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn into_parts(self) -> (Router, Vec<JoinHandle<()>>) {
        (self.router, self.lanes)
    }

    /// Drop the router and wait for every lane to flush and exit.
    ///
    /// Lanes only stop once all router clones are gone. Commits of the final
    /// batches are dispatched but not awaited.
    pub async fn close(self) {
        drop(self.router);
        for handle in self.lanes {
            let _ = handle.await;
        }
    }
}
