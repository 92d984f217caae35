//! Daemon startup sequence.
//!
//! Every step before the listener is running is fatal on failure: the
//! process either comes up with all connections established and the port
//! bound, or it does not come up at all.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rowpipe_client::{ConnectionFactory, ConnectionPool, RestConnectionFactory};
use rowpipe_ingest::{spawn_reporter, IngestStats, Listener, Pipeline};
use rowpipe_observability::exporter;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;

/// A running daemon. Background tasks are aborted when this is dropped.
pub struct Server {
    listen_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
    stats: Arc<IngestStats>,
    tasks: Vec<JoinHandle<()>>,
}

impl Server {
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Start the daemon against the HBase REST gateway named in `config`.
pub async fn start(config: &Config) -> Result<Server> {
    let factory = RestConnectionFactory::new(config.rest_config());
    start_with_factory(config, &factory).await
}

/// Start the daemon with connections from `factory`.
pub async fn start_with_factory<F>(config: &Config, factory: &F) -> Result<Server>
where
    F: ConnectionFactory,
{
    rowpipe_observability::init_metrics();

    info!(
        size = config.system.pool_size,
        host = %config.db.hbase_host,
        port = config.db.hbase_port,
        "Connecting to storage"
    );
    let pool = match ConnectionPool::connect(config.system.pool_size, factory).await {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            error!(error = %e, size = config.system.pool_size, "Connection pool initialization failed");
            return Err(anyhow::Error::new(e).context("failed to build storage connection pool"));
        }
    };
    info!(size = pool.size(), "Storage connection pool initialized");

    let stats = IngestStats::new();
    let pipeline = Pipeline::start(config.pipeline_config()?, pool, stats.clone())
        .context("failed to start pipeline")?;

    let listener = Listener::bind(config.listen_addr(), stats.clone())
        .await
        .context("failed to bind UDP listener")?;
    let listen_addr = listener.local_addr()?;

    let (router, lanes) = pipeline.into_parts();
    let mut tasks = lanes;
    tasks.push(tokio::spawn(listener.run(router)));
    tasks.push(spawn_reporter(stats.clone(), config.report_interval()));

    let metrics_addr = match config.system.metrics_addr {
        Some(addr) => {
            let metrics_listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind metrics endpoint on {}", addr))?;
            let bound = metrics_listener.local_addr()?;
            tasks.push(tokio::spawn(async move {
                if let Err(e) = exporter::serve(metrics_listener).await {
                    error!(error = %e, "Metrics server stopped");
                }
            }));
            Some(bound)
        }
        None => None,
    };

    info!(addr = %listen_addr, "rowpipe started");
    Ok(Server {
        listen_addr,
        metrics_addr,
        stats,
        tasks,
    })
}
