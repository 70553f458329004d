//! bulkd - bulk collector server
//!
//! Accepts newline-delimited command streams over TCP, groups them into
//! bulks per connection, and fans every bulk out to the console and to
//! per-bulk files on disk.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: port 9000, bulk size 3
//! bulkd
//!
//! # Port and bulk size as flags
//! bulkd --port 9000 --bulk-size 5
//!
//! # With a config file; flags still win
//! bulkd --config bulkd.toml --output-dir ./bulks
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bulk_session::DispatcherConfig;
use bulk_sources::{TcpSource, TcpSourceConfig};

use crate::config::ServerConfig;

/// bulkd - bulk collector server
#[derive(Parser, Debug)]
#[command(name = "bulkd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    address: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Static bulk size per session (0 = dynamic blocks only)
    #[arg(short, long)]
    bulk_size: Option<usize>,

    /// Number of file workers
    #[arg(long)]
    file_workers: Option<usize>,

    /// Directory for per-bulk files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Resolve the effective configuration: defaults, then file, then flags
    fn resolve(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(address) = &self.address {
            config.listen.address = address.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(size) = self.bulk_size {
            config.bulk.size = size;
        }
        if let Some(workers) = self.file_workers {
            config.dispatch.file_workers = workers;
        }
        if let Some(dir) = &self.output_dir {
            config.dispatch.output_dir = dir.clone();
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = cli.resolve()?;
    tracing::info!(
        address = %config.listen.address,
        port = config.listen.port,
        bulk_size = config.bulk.size,
        file_workers = config.dispatch.file_workers,
        output_dir = %config.dispatch.output_dir.display(),
        "bulkd starting"
    );

    bulk_session::init(
        DispatcherConfig::default()
            .with_file_workers(config.dispatch.file_workers)
            .with_output_dir(&config.dispatch.output_dir),
    );

    let source = TcpSource::new(TcpSourceConfig {
        address: config.listen.address,
        port: config.listen.port,
        bulk_size: config.bulk.size,
        ..Default::default()
    });
    let metrics = source.metrics();

    let cancel = CancellationToken::new();
    let server = tokio::spawn(source.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // Stop accepting, end the open sessions, then flush and join the
    // pipeline workers so no accepted bulk is lost.
    cancel.cancel();
    server.await??;
    bulk_session::shutdown();

    let snapshot = metrics.snapshot();
    tracing::info!(
        connections = snapshot.connections_total,
        bytes = snapshot.bytes_received,
        "bulkd stopped"
    );

    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
