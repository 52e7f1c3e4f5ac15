use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use scrawl_common::{config, logger};
use scrawl_tracker::{registry::Registry, rpc::TrackerRpcServer};

#[derive(Parser)]
#[clap(version = config::VERSION, about = "Scrawl membership tracker")]
struct TrackerOptions {
    /// Address to bind the HTTP server on
    #[clap(long, default_value = config::DEFAULT_TRACKER_BIND_ADDRESS)]
    bind_address: String,

    /// Miner entry lifetime in milliseconds
    #[clap(long, default_value_t = config::ENTRY_TIMEOUT.as_millis() as u64)]
    entry_timeout_ms: u64,

    /// Log level (off, error, warn, info, debug, trace)
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = TrackerOptions::parse();
    logger::setup(options.log_level).context("Failed to initialize logger")?;

    let registry = Arc::new(Registry::new(Duration::from_millis(options.entry_timeout_ms)));
    let sweeper = registry.start_sweeper(config::SWEEP_INTERVAL);
    let server = TrackerRpcServer::new(Arc::clone(&registry), &options.bind_address).await?;

    info!("Tracker is ready");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down...");
    server.stop().await;
    sweeper.abort();

    Ok(())
}
