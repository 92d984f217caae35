//! Integration tests for `RestTableClient` against a stand-in REST gateway.
//!
//! The gateway is a small axum app that answers the cluster version probe
//! and records multi-row puts, so these tests exercise the real HTTP path:
//! connection probe, JSON cell-set body, status handling and pool reuse.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine};
use rowpipe_client::rest::CellSet;
use rowpipe_client::{
    ClientError, ConnectionPool, Put, RestConfig, RestConnectionFactory, RestTableClient,
    TableClient,
};
use tokio::net::TcpListener;

#[derive(Default)]
struct Gateway {
    /// (table, row-in-url, body) of every put
    puts: Mutex<Vec<(String, String, CellSet)>>,
    /// Status to answer puts with; 0 means 200
    put_status: AtomicU16,
    probe_status: AtomicU16,
}

async fn version(State(gw): State<Arc<Gateway>>) -> (StatusCode, &'static str) {
    match gw.probe_status.load(Ordering::SeqCst) {
        0 => (StatusCode::OK, "2.5.8"),
        code => (StatusCode::from_u16(code).unwrap(), "unavailable"),
    }
}

async fn multi_put(
    State(gw): State<Arc<Gateway>>,
    Path((table, row)): Path<(String, String)>,
    Json(body): Json<CellSet>,
) -> (StatusCode, &'static str) {
    match gw.put_status.load(Ordering::SeqCst) {
        0 => {
            gw.puts.lock().unwrap().push((table, row, body));
            (StatusCode::OK, "")
        }
        code => (StatusCode::from_u16(code).unwrap(), "region server busy"),
    }
}

async fn start_gateway() -> (RestConfig, Arc<Gateway>) {
    let gw = Arc::new(Gateway::default());
    let app = Router::new()
        .route("/version/cluster", get(version))
        .route("/:table/:row", put(multi_put))
        .with_state(gw.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = RestConfig {
        base_url: format!("http://{}", addr),
        connect_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(2),
    };
    (config, gw)
}

fn decode(s: &str) -> Vec<u8> {
    STANDARD.decode(s).unwrap()
}

#[tokio::test]
async fn test_put_multiple_sends_cell_set() {
    let (config, gw) = start_gateway().await;
    let client = RestTableClient::connect(config).await.unwrap();

    client
        .put_multiple(
            "hbase_test",
            &[
                Put::single("alice", "name", "info", "hello"),
                Put::single("bob", "name", "info", "b:c"),
            ],
        )
        .await
        .unwrap();

    let puts = gw.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    let (table, row, body) = &puts[0];
    assert_eq!(table, "hbase_test");
    assert_eq!(row, "false-row-key");
    assert_eq!(body.rows.len(), 2);
    assert_eq!(decode(&body.rows[0].key), b"alice");
    assert_eq!(decode(&body.rows[0].cells[0].column), b"name:info");
    assert_eq!(decode(&body.rows[1].cells[0].value), b"b:c");
}

#[tokio::test]
async fn test_table_name_stays_one_path_segment() {
    let (config, gw) = start_gateway().await;
    let client = RestTableClient::connect(config).await.unwrap();

    client
        .put_multiple("ns/t?x", &[Put::single("k", "name", "info", "v")])
        .await
        .unwrap();

    let puts = gw.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, "ns/t?x");
    assert_eq!(puts[0].1, "false-row-key");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (config, gw) = start_gateway().await;
    let client = RestTableClient::connect(config).await.unwrap();
    gw.put_status.store(503, Ordering::SeqCst);

    let err = client
        .put_multiple("t", &[Put::single("k", "f", "q", "v")])
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "region server busy");
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_put_skips_request() {
    let (config, gw) = start_gateway().await;
    let client = RestTableClient::connect(config).await.unwrap();

    client.put_multiple("t", &[]).await.unwrap();
    assert!(gw.puts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_probe_fails_connect() {
    let (config, gw) = start_gateway().await;
    gw.probe_status.store(500, Ordering::SeqCst);

    let result = RestTableClient::connect(config).await;
    assert!(matches!(result, Err(ClientError::Connection(_))));
}

#[tokio::test]
async fn test_pool_of_rest_clients() {
    let (config, gw) = start_gateway().await;
    let factory = RestConnectionFactory::new(config);
    let pool = ConnectionPool::connect(4, &factory).await.unwrap();
    assert_eq!(pool.stats().available, 4);

    for i in 0..8 {
        let conn = pool.acquire().await.unwrap();
        conn.put_multiple("t", &[Put::single(format!("row-{}", i), "f", "q", "v")])
            .await
            .unwrap();
    }

    assert_eq!(gw.puts.lock().unwrap().len(), 8);
    assert_eq!(pool.stats().checked_out, 0);
}

#[tokio::test]
async fn test_pool_init_fails_when_gateway_down() {
    let (config, gw) = start_gateway().await;
    gw.probe_status.store(503, Ordering::SeqCst);

    let factory = RestConnectionFactory::new(config);
    let result = ConnectionPool::connect(2, &factory).await;
    assert!(matches!(
        result,
        Err(ClientError::PoolInit { created: 0, size: 2, .. })
    ));
}
