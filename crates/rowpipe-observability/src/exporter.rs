//! Prometheus text exposition over HTTP.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;

use crate::metrics::REGISTRY;

/// Render every registered metric in the text format.
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();

    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut body) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type())], body).into_response()
}

pub fn create_metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve the metrics router on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "Metrics server listening");
    }
    axum::serve(listener, create_metrics_router()).await
}
