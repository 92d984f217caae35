use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Once;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Ingestion Metrics
    // ============================================================================

    /// Datagrams read from the listening socket
    pub static ref DATAGRAMS_RECEIVED_TOTAL: IntCounter = IntCounter::new(
        "rowpipe_datagrams_received_total",
        "Total datagrams received"
    ).expect("metric can be created");

    /// Datagrams rejected by the decoder
    pub static ref RECORDS_MALFORMED_TOTAL: IntCounter = IntCounter::new(
        "rowpipe_records_malformed_total",
        "Total datagrams dropped as malformed records"
    ).expect("metric can be created");

    /// Records enqueued onto a lane
    pub static ref RECORDS_ROUTED_TOTAL: IntCounter = IntCounter::new(
        "rowpipe_records_routed_total",
        "Total records routed to a lane"
    ).expect("metric can be created");

    // ============================================================================
    // Batch Metrics
    // ============================================================================

    /// Batches sealed by lane buffers, by trigger
    pub static ref BATCHES_FLUSHED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rowpipe_batches_flushed_total", "Total batches flushed by lane buffers"),
        &["reason"] // full, idle, closed
    ).expect("metric can be created");

    /// Records per flushed batch
    pub static ref BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("rowpipe_batch_size", "Batch size in records")
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 500.0, 1000.0])
    ).expect("metric can be created");

    // ============================================================================
    // Commit Metrics
    // ============================================================================

    /// Latency of a single multi-row write attempt
    pub static ref COMMIT_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new("rowpipe_commit_latency_seconds", "Multi-row write latency in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("metric can be created");

    /// Batches committed successfully
    pub static ref BATCHES_COMMITTED_TOTAL: IntCounter = IntCounter::new(
        "rowpipe_batches_committed_total",
        "Total batches committed"
    ).expect("metric can be created");

    /// Failed attempts that were followed by a retry
    pub static ref COMMIT_RETRIES_TOTAL: IntCounter = IntCounter::new(
        "rowpipe_commit_retries_total",
        "Total commit retries"
    ).expect("metric can be created");

    /// Batches dropped after exhausting retries
    pub static ref BATCHES_ABANDONED_TOTAL: IntCounter = IntCounter::new(
        "rowpipe_batches_abandoned_total",
        "Total batches abandoned after exhausting retries"
    ).expect("metric can be created");

    /// Records lost with abandoned batches
    pub static ref RECORDS_ABANDONED_TOTAL: IntCounter = IntCounter::new(
        "rowpipe_records_abandoned_total",
        "Total records lost with abandoned batches"
    ).expect("metric can be created");

    // ============================================================================
    // Connection Pool Metrics
    // ============================================================================

    /// Storage connections currently checked out
    pub static ref POOL_CONNECTIONS_IN_USE: IntGauge = IntGauge::new(
        "rowpipe_pool_connections_in_use",
        "Storage connections currently checked out"
    ).expect("metric can be created");
}

/// Register all metrics with `REGISTRY`. Safe to call more than once.
pub fn init() {
    INIT.call_once(|| {
        // Ingestion metrics
        REGISTRY
            .register(Box::new(DATAGRAMS_RECEIVED_TOTAL.clone()))
            .expect("datagrams_received_total can be registered");
        REGISTRY
            .register(Box::new(RECORDS_MALFORMED_TOTAL.clone()))
            .expect("records_malformed_total can be registered");
        REGISTRY
            .register(Box::new(RECORDS_ROUTED_TOTAL.clone()))
            .expect("records_routed_total can be registered");

        // Batch metrics
        REGISTRY
            .register(Box::new(BATCHES_FLUSHED_TOTAL.clone()))
            .expect("batches_flushed_total can be registered");
        REGISTRY
            .register(Box::new(BATCH_SIZE.clone()))
            .expect("batch_size can be registered");

        // Commit metrics
        REGISTRY
            .register(Box::new(COMMIT_LATENCY.clone()))
            .expect("commit_latency can be registered");
        REGISTRY
            .register(Box::new(BATCHES_COMMITTED_TOTAL.clone()))
            .expect("batches_committed_total can be registered");
        REGISTRY
            .register(Box::new(COMMIT_RETRIES_TOTAL.clone()))
            .expect("commit_retries_total can be registered");
        REGISTRY
            .register(Box::new(BATCHES_ABANDONED_TOTAL.clone()))
            .expect("batches_abandoned_total can be registered");
        REGISTRY
            .register(Box::new(RECORDS_ABANDONED_TOTAL.clone()))
            .expect("records_abandoned_total can be registered");

        // Pool metrics
        REGISTRY
            .register(Box::new(POOL_CONNECTIONS_IN_USE.clone()))
            .expect("pool_connections_in_use can be registered");
    });
}
