//! Configuration file for the rowpipe daemon.
//!
//! ```toml
//! [db]
//! put_table = "hbase_test"
//! hbase_host = "127.0.0.1"
//! hbase_port = 8080
//!
//! [system]
//! receive_port = 9090
//! channel_cache = 1000
//! max_fail_num = 10
//!
//! # Optional
//! lanes = 50
//! batch_capacity = 200
//! idle_timeout_ms = 10000
//! retry_backoff_ms = 2000
//! pool_size = 1000
//! lane_routing = "round_robin"   # or "key_hash"
//! report_interval_secs = 5
//! column_family = "name"
//! column_qualifier = "info"
//! metrics_addr = "0.0.0.0:9100"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rowpipe_client::{RestConfig, RetryPolicy};
use rowpipe_ingest::{LaneSelector, PipelineConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db: DbConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// Table every record is written to
    pub put_table: String,

    /// HBase REST gateway host
    pub hbase_host: String,

    /// HBase REST gateway port
    pub hbase_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// UDP port to receive datagrams on, all interfaces
    pub receive_port: u16,

    /// Queue depth in front of each lane
    pub channel_cache: usize,

    /// Retries after the first failed commit attempt
    pub max_fail_num: usize,

    #[serde(default = "default_lanes")]
    pub lanes: usize,

    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_lane_routing")]
    pub lane_routing: String,

    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    #[serde(default = "default_column_family")]
    pub column_family: String,

    #[serde(default = "default_column_qualifier")]
    pub column_qualifier: String,

    /// Serve Prometheus metrics on this address when set
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

fn default_lanes() -> usize {
    50
}

fn default_batch_capacity() -> usize {
    200
}

fn default_idle_timeout_ms() -> u64 {
    10_000
}

fn default_retry_backoff_ms() -> u64 {
    2_000
}

fn default_pool_size() -> usize {
    1000
}

fn default_lane_routing() -> String {
    "round_robin".to_string()
}

fn default_report_interval_secs() -> u64 {
    5
}

fn default_column_family() -> String {
    "name".to_string()
}

fn default_column_qualifier() -> String {
    "info".to_string()
}

impl Config {
    /// Read, parse and validate the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.db.put_table.is_empty() {
            bail!("db.put_table must not be empty");
        }
        if self.db.hbase_host.is_empty() {
            bail!("db.hbase_host must not be empty");
        }

        let sizes = [
            ("system.channel_cache", self.system.channel_cache),
            ("system.lanes", self.system.lanes),
            ("system.batch_capacity", self.system.batch_capacity),
            ("system.pool_size", self.system.pool_size),
        ];
        for (key, value) in sizes {
            if value == 0 {
                bail!("{} must be at least 1", key);
            }
        }
        if self.system.idle_timeout_ms == 0 {
            bail!("system.idle_timeout_ms must be at least 1");
        }
        if self.system.report_interval_secs == 0 {
            bail!("system.report_interval_secs must be at least 1");
        }

        self.lane_selector()?;
        Ok(())
    }

    pub fn lane_selector(&self) -> Result<LaneSelector> {
        self.system
            .lane_routing
            .parse()
            .context("invalid system.lane_routing")
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.system.receive_port))
    }

    pub fn rest_config(&self) -> RestConfig {
        RestConfig::new(&self.db.hbase_host, self.db.hbase_port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.system.max_fail_num,
            Duration::from_millis(self.system.retry_backoff_ms),
        )
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.system.report_interval_secs)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            lanes: self.system.lanes,
            batch_capacity: self.system.batch_capacity,
            lane_queue_depth: self.system.channel_cache,
            idle_timeout: Duration::from_millis(self.system.idle_timeout_ms),
            routing: self.lane_selector()?,
            table: self.db.put_table.clone(),
            column_family: self.system.column_family.clone(),
            column_qualifier: self.system.column_qualifier.clone(),
            retry: self.retry_policy(),
        })
    }

    /// Log every loaded value at startup.
    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  PutTable: {}", self.db.put_table);
        tracing::info!("  HbaseHost: {}", self.db.hbase_host);
        tracing::info!("  HbasePort: {}", self.db.hbase_port);
        tracing::info!("  ReceivePort: {}", self.system.receive_port);
        tracing::info!("  ChannelCache: {}", self.system.channel_cache);
        tracing::info!("  MaxFailNum: {}", self.system.max_fail_num);
        tracing::info!("  Lanes: {}", self.system.lanes);
        tracing::info!("  BatchCapacity: {}", self.system.batch_capacity);
        tracing::info!("  IdleTimeout: {}ms", self.system.idle_timeout_ms);
        tracing::info!("  RetryBackoff: {}ms", self.system.retry_backoff_ms);
        tracing::info!("  PoolSize: {}", self.system.pool_size);
        tracing::info!("  LaneRouting: {}", self.system.lane_routing);
        tracing::info!(
            "  Column: {}:{}",
            self.system.column_family,
            self.system.column_qualifier
        );
        match self.system.metrics_addr {
            Some(addr) => tracing::info!("  Metrics: {}", addr),
            None => tracing::info!("  Metrics: disabled"),
        }
    }
}
