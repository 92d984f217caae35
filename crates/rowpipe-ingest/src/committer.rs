//! Commit executor: writes sealed batches to storage.
//!
//! One batch becomes one multi-row `put_multiple` call. Each attempt checks a
//! connection out of the shared pool, writes, and gives the connection back
//! before the retry backoff starts, so a failing batch never holds a
//! connection while it sleeps.
//!
//! When every attempt fails the batch is dropped and an `error` event with
//! the lane, sequence number and record count is emitted. That event is the
//! only trace of the lost records.

use std::sync::Arc;

use bytes::Bytes;
use rowpipe_client::{
    retry_with_fixed_backoff, ConnectionPool, Put, RetryPolicy, TableClient,
};
use rowpipe_core::Batch;
use rowpipe_observability::metrics;
use tracing::{debug, error, info};

use crate::lane::BatchSink;
use crate::stats::IngestStats;

/// Where and how batches are written.
#[derive(Debug, Clone)]
pub struct CommitConfig {
    pub table: String,
    pub column_family: Bytes,
    pub column_qualifier: Bytes,
    pub retry: RetryPolicy,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            table: "rowpipe".to_string(),
            column_family: Bytes::from_static(b"name"),
            column_qualifier: Bytes::from_static(b"info"),
            retry: RetryPolicy::default(),
        }
    }
}

/// Final state of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { attempts: usize },
    /// Every attempt failed; the records are lost.
    Abandoned { attempts: usize },
}

impl CommitOutcome {
    pub fn attempts(&self) -> usize {
        match self {
            CommitOutcome::Committed { attempts } | CommitOutcome::Abandoned { attempts } => {
                *attempts
            }
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }
}

/// Commits batches through a shared connection pool.
///
/// Clones share the pool, configuration and counters.
pub struct CommitExecutor<C> {
    pool: Arc<ConnectionPool<C>>,
    config: Arc<CommitConfig>,
    stats: Arc<IngestStats>,
}

impl<C> Clone for CommitExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            config: self.config.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<C: TableClient> CommitExecutor<C> {
    pub fn new(pool: Arc<ConnectionPool<C>>, config: CommitConfig, stats: Arc<IngestStats>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            stats,
        }
    }

    /// One row per record: row key = record key, a single cell under the
    /// configured family and qualifier holding the record value.
    pub fn to_puts(&self, batch: Batch) -> Vec<Put> {
        batch
            .into_records()
            .into_iter()
            .map(|record| {
                Put::single(
                    record.key,
                    self.config.column_family.clone(),
                    self.config.column_qualifier.clone(),
                    record.value,
                )
            })
            .collect()
    }

    /// Write `batch`, retrying per the configured policy.
    #[tracing::instrument(
        name = "commit",
        skip(self, batch),
        fields(lane = batch.lane(), seq = batch.seq(), records = batch.len())
    )]
    pub async fn commit(&self, batch: Batch) -> CommitOutcome {
        let (lane, seq, records) = (batch.lane(), batch.seq(), batch.len());
        let puts = self.to_puts(batch);
        let puts = puts.as_slice();
        let executor = self;

        let result = retry_with_fixed_backoff(&self.config.retry, move |_attempt| {
            executor.write_once(puts)
        })
        .await;

        match result {
            Ok(((), attempts)) => {
                self.stats.record_retries(attempts - 1);
                self.stats.record_committed(records);
                if attempts > 1 {
                    info!(attempts = attempts, "Batch committed after retry");
                } else {
                    debug!("Batch committed");
                }
                CommitOutcome::Committed { attempts }
            }
            Err(e) => {
                self.stats.record_retries(e.attempts - 1);
                self.stats.record_abandoned(records);
                error!(
                    lane = lane,
                    seq = seq,
                    records = records,
                    attempts = e.attempts,
                    table = %self.config.table,
                    error = %e.last_error,
                    "Batch abandoned after exhausting retries, records lost"
                );
                CommitOutcome::Abandoned {
                    attempts: e.attempts,
                }
            }
        }
    }

    async fn write_once(&self, puts: &[Put]) -> rowpipe_client::Result<()> {
        let conn = self.pool.acquire().await?;
        metrics::POOL_CONNECTIONS_IN_USE.inc();

        let timer = metrics::COMMIT_LATENCY.start_timer();
        let result = conn.put_multiple(&self.config.table, puts).await;
        timer.observe_duration();

        drop(conn);
        metrics::POOL_CONNECTIONS_IN_USE.dec();
        result
    }
}

impl<C: TableClient> BatchSink for CommitExecutor<C> {
    fn dispatch(&self, batch: Batch) {
        let executor = self.clone();
        tokio::spawn(async move {
            executor.commit(batch).await;
        });
    }
}
