//! Pipeline counters and the periodic diagnostics reporter.
//!
//! `IngestStats` is the in-process view used by tests and the reporter log
//! line. Every update is mirrored into the Prometheus metrics of
//! `rowpipe_observability`, so the two never need separate bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rowpipe_core::FlushReason;
use rowpipe_observability::metrics;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared pipeline counters. Relaxed ordering: values are diagnostic only.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    malformed: AtomicU64,
    routed: AtomicU64,
    batches_flushed: AtomicU64,
    batches_committed: AtomicU64,
    records_committed: AtomicU64,
    commit_retries: AtomicU64,
    batches_abandoned: AtomicU64,
    records_abandoned: AtomicU64,
}

/// Point-in-time copy of `IngestStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub malformed: u64,
    pub routed: u64,
    pub batches_flushed: u64,
    pub batches_committed: u64,
    pub records_committed: u64,
    pub commit_retries: u64,
    pub batches_abandoned: u64,
    pub records_abandoned: u64,
}

impl IngestStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        metrics::DATAGRAMS_RECEIVED_TOTAL.inc();
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
        metrics::RECORDS_MALFORMED_TOTAL.inc();
    }

    pub fn record_routed(&self) {
        self.routed.fetch_add(1, Ordering::Relaxed);
        metrics::RECORDS_ROUTED_TOTAL.inc();
    }

    pub fn record_flush(&self, reason: FlushReason, records: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        metrics::BATCHES_FLUSHED_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
        metrics::BATCH_SIZE.observe(records as f64);
    }

    pub fn record_committed(&self, records: usize) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.records_committed
            .fetch_add(records as u64, Ordering::Relaxed);
        metrics::BATCHES_COMMITTED_TOTAL.inc();
    }

    pub fn record_retries(&self, retries: usize) {
        if retries == 0 {
            return;
        }
        self.commit_retries
            .fetch_add(retries as u64, Ordering::Relaxed);
        metrics::COMMIT_RETRIES_TOTAL.inc_by(retries as u64);
    }

    pub fn record_abandoned(&self, records: usize) {
        self.batches_abandoned.fetch_add(1, Ordering::Relaxed);
        self.records_abandoned
            .fetch_add(records as u64, Ordering::Relaxed);
        metrics::BATCHES_ABANDONED_TOTAL.inc();
        metrics::RECORDS_ABANDONED_TOTAL.inc_by(records as u64);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            routed: self.routed.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            records_committed: self.records_committed.load(Ordering::Relaxed),
            commit_retries: self.commit_retries.load(Ordering::Relaxed),
            batches_abandoned: self.batches_abandoned.load(Ordering::Relaxed),
            records_abandoned: self.records_abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Log the running totals every `interval` until the task is aborted.
///
/// The first report is emitted one full interval after spawning.
pub fn spawn_reporter(stats: Arc<IngestStats>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);

        loop {
            ticker.tick().await;

            let s = stats.snapshot();
            info!(
                received = s.received,
                malformed = s.malformed,
                batches_committed = s.batches_committed,
                records_committed = s.records_committed,
                commit_retries = s.commit_retries,
                records_abandoned = s.records_abandoned,
                "now get: {}",
                s.received
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_at_zero() {
        let stats = IngestStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let stats = IngestStats::new();
        stats.record_received();
        stats.record_received();
        stats.record_malformed();
        stats.record_routed();
        stats.record_flush(FlushReason::Full, 200);
        stats.record_committed(200);
        stats.record_retries(3);
        stats.record_abandoned(5);

        let s = stats.snapshot();
        assert_eq!(s.received, 2);
        assert_eq!(s.malformed, 1);
        assert_eq!(s.routed, 1);
        assert_eq!(s.batches_flushed, 1);
        assert_eq!(s.batches_committed, 1);
        assert_eq!(s.records_committed, 200);
        assert_eq!(s.commit_retries, 3);
        assert_eq!(s.batches_abandoned, 1);
        assert_eq!(s.records_abandoned, 5);
        assert_eq!(stats.received(), 2);
    }

    #[test]
    fn test_zero_retries_not_counted() {
        let stats = IngestStats::new();
        stats.record_retries(0);
        assert_eq!(stats.snapshot().commit_retries, 0);
    }

    #[tokio::test]
    async fn test_reporter_runs_until_aborted() {
        let stats = IngestStats::new();
        stats.record_received();

        let handle = spawn_reporter(stats.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(!handle.is_finished());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
