//! rowpipe Observability
//!
//! Prometheus metrics for the ingestion pipeline and an axum router that
//! serves them.
//!
//! # Usage
//!
//! ```no_run
//! use rowpipe_observability::{exporter, metrics};
//!
//! // Register metrics with the registry
//! metrics::init();
//!
//! // Serve them on /metrics
//! let metrics_router = exporter::create_metrics_router();
//! ```

pub mod exporter;
pub mod metrics;

pub use metrics::{init as init_metrics, REGISTRY};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_alias() {
        init_metrics();
        let _registry = &*REGISTRY;
    }

    #[test]
    fn test_double_init_is_safe() {
        init_metrics();
        init_metrics();
    }
}
