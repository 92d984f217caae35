//! rowpipe daemon
//!
//! Receives `key:value` datagrams over UDP and writes them to an HBase table
//! in batches, one row per record.
//!
//! ## Usage
//!
//! ```bash
//! rowpipe --config /etc/rowpipe/rowpipe.toml
//! ROWPIPE_CONFIG=./rowpipe.toml rowpipe
//! ```
//!
//! See `config` for the file format.
//!
//! ## Logging
//! Logging is controlled via the `RUST_LOG` environment variable:
//! ```bash
//! RUST_LOG=debug rowpipe --config rowpipe.toml   # Per-batch logs
//! RUST_LOG=info rowpipe --config rowpipe.toml    # Standard logs (default)
//! ```
//!
//! ## Shutdown
//! Ctrl-C exits immediately. Records still buffered in lanes or waiting on a
//! retry are not written.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rowpipe_server::{start, Config};

#[derive(Parser)]
#[command(name = "rowpipe")]
#[command(about = "UDP key/value ingestion into HBase", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "ROWPIPE_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("system startup");

    let config = Config::load(&cli.config).map_err(fatal)?;
    config.log_summary();

    let server = start(&config).await.map_err(fatal)?;
    tracing::info!(
        addr = %server.listen_addr(),
        metrics = ?server.metrics_addr(),
        "Ready to receive datagrams"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!(
        received = server.stats().received(),
        "Received shutdown signal, exiting without draining"
    );

    Ok(())
}

/// Log a startup failure through the subscriber before exiting.
fn fatal(e: anyhow::Error) -> anyhow::Error {
    tracing::error!("Startup failed: {:#}", e);
    e
}
