//! HBase REST Gateway Client
//!
//! Writes rows through the HBase REST gateway ("Stargate") using its JSON
//! cell-set representation. A multi-row put is a single request:
//!
//! ```text
//! PUT {base_url}/{table}/false-row-key
//! Content-Type: application/json
//!
//! {"Row":[{"key":"<b64 row>","Cell":[{"column":"<b64 family:qualifier>","$":"<b64 value>"}]}]}
//! ```
//!
//! The row in the URL is a placeholder; the gateway takes row keys from the
//! body. Row keys, columns and values are base64 encoded.
//!
//! ## Connections
//!
//! Each `RestTableClient` owns its own `reqwest::Client` limited to one idle
//! connection, so a pool of N clients holds N gateway connections. `connect`
//! probes `GET {base_url}/version/cluster` and fails if the gateway does not
//! answer with a success status.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::table::{ConnectionFactory, Put, TableClient};

/// Placeholder row used in multi-row put URLs.
const MULTI_ROW_PLACEHOLDER: &str = "false-row-key";

/// Connection settings for the REST gateway.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL, e.g. `http://127.0.0.1:8080`
    pub base_url: String,

    /// Timeout for establishing the TCP connection
    pub connect_timeout: Duration,

    /// Overall timeout for one request
    pub request_timeout: Duration,
}

impl RestConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}", host, port),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// JSON cell-set body accepted by the gateway.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellSet {
    #[serde(rename = "Row")]
    pub rows: Vec<CellSetRow>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellSetRow {
    pub key: String,
    #[serde(rename = "Cell")]
    pub cells: Vec<CellSetCell>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellSetCell {
    pub column: String,
    #[serde(rename = "$")]
    pub value: String,
}

/// Storage client speaking to one HBase REST gateway.
#[derive(Debug, Clone)]
pub struct RestTableClient {
    http: reqwest::Client,
    config: RestConfig,
}

impl RestTableClient {
    /// Build a client and verify the gateway is reachable.
    pub async fn connect(config: RestConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(1)
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        let client = Self { http, config };
        client.probe().await?;
        Ok(client)
    }

    async fn probe(&self) -> Result<()> {
        let url = format!("{}/version/cluster", self.config.base_url);
        let response = self.http.get(&url).send().await.map_err(|e| {
            ClientError::Connection(format!("{} unreachable: {}", self.config.base_url, e))
        })?;

        if !response.status().is_success() {
            return Err(ClientError::Connection(format!(
                "{} answered probe with HTTP {}",
                self.config.base_url,
                response.status()
            )));
        }
        Ok(())
    }

    /// Translate puts into the gateway's cell-set body.
    pub fn build_cell_set(puts: &[Put]) -> CellSet {
        let rows = puts
            .iter()
            .map(|put| CellSetRow {
                key: STANDARD.encode(&put.row),
                cells: put
                    .columns
                    .iter()
                    .map(|col| {
                        let mut column = Vec::with_capacity(col.family.len() + 1 + col.qualifier.len());
                        column.extend_from_slice(&col.family);
                        column.push(b':');
                        column.extend_from_slice(&col.qualifier);
                        CellSetCell {
                            column: STANDARD.encode(column),
                            value: STANDARD.encode(&col.value),
                        }
                    })
                    .collect(),
            })
            .collect();
        CellSet { rows }
    }
}

#[async_trait]
impl TableClient for RestTableClient {
    async fn put_multiple(&self, table: &str, puts: &[Put]) -> Result<()> {
        if puts.is_empty() {
            return Ok(());
        }

        let body = serde_json::to_vec(&Self::build_cell_set(puts))?;
        let url = multi_put_url(&self.config.base_url, table)?;

        let response = self
            .http
            .put(url.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("PUT {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(table = %table, rows = puts.len(), "Multi-row put accepted");
        Ok(())
    }
}

/// `{base_url}/{table}/false-row-key`, with the table name escaped as one
/// path segment.
fn multi_put_url(base_url: &str, table: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| ClientError::Config(format!("invalid gateway URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Config(format!("gateway URL {} cannot carry a path", base_url)))?
        .pop_if_empty()
        .push(table)
        .push(MULTI_ROW_PLACEHOLDER);
    Ok(url)
}

/// Creates `RestTableClient`s for the connection pool.
#[derive(Debug, Clone)]
pub struct RestConnectionFactory {
    config: RestConfig,
}

impl RestConnectionFactory {
    pub fn new(config: RestConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConnectionFactory for RestConnectionFactory {
    type Client = RestTableClient;

    async fn connect(&self) -> Result<RestTableClient> {
        RestTableClient::connect(self.config.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str) -> Vec<u8> {
        STANDARD.decode(s).unwrap()
    }

    #[test]
    fn test_rest_config_new() {
        let config = RestConfig::new("hbase.internal", 8080);
        assert_eq!(config.base_url, "http://hbase.internal:8080");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_multi_put_url_escapes_table() {
        let url = multi_put_url("http://127.0.0.1:8080", "hbase_test").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/hbase_test/false-row-key");

        let url = multi_put_url("http://127.0.0.1:8080/", "ns/t?x#y").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/ns%2Ft%3Fx%23y/false-row-key");
    }

    #[test]
    fn test_multi_put_url_rejects_bad_base() {
        assert!(matches!(
            multi_put_url("not a url", "t"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_build_cell_set_encodes_rows() {
        let puts = vec![
            Put::single("alice", "name", "info", "hello"),
            Put::single("bob", "name", "info", "a:b"),
        ];
        let cell_set = RestTableClient::build_cell_set(&puts);

        assert_eq!(cell_set.rows.len(), 2);
        assert_eq!(decode(&cell_set.rows[0].key), b"alice");
        assert_eq!(decode(&cell_set.rows[0].cells[0].column), b"name:info");
        assert_eq!(decode(&cell_set.rows[0].cells[0].value), b"hello");
        assert_eq!(decode(&cell_set.rows[1].key), b"bob");
        assert_eq!(decode(&cell_set.rows[1].cells[0].value), b"a:b");
    }

    #[test]
    fn test_cell_set_json_field_names() {
        let cell_set = RestTableClient::build_cell_set(&[Put::single("k", "f", "q", "v")]);
        let json: serde_json::Value = serde_json::to_value(&cell_set).unwrap();

        let row = &json["Row"][0];
        assert!(row.get("key").is_some());
        let cell = &row["Cell"][0];
        assert!(cell.get("column").is_some());
        assert!(cell.get("$").is_some());
    }

    #[tokio::test]
    async fn test_connect_unreachable_gateway_fails() {
        let config = RestConfig {
            // Port 9 (discard) on localhost is closed in test environments
            base_url: "http://127.0.0.1:9".to_string(),
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(500),
        };
        let result = RestTableClient::connect(config).await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }
}
