use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;

use scrawl_common::{
    config::DEFAULT_MINER_HOST,
    difficulty::MAX_TARGET_BITS,
    logger,
};
use scrawl_daemon::{
    config::NodeOptions,
    core::{blockchain::Blockchain, mining::ChainWorker},
    p2p::P2p,
    rpc::NodeRpcServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let options = NodeOptions::parse();
    logger::setup(options.log_level).context("Failed to initialize logger")?;

    ensure!(
        options.target_bits <= MAX_TARGET_BITS,
        "target bits must be at most {}",
        MAX_TARGET_BITS
    );

    let blockchain = Arc::new(Blockchain::new(options.target_bits));
    let p2p = Arc::new(P2p::new(options.tracker_address.clone(), options.port)?);

    let bind_address = format!("{}:{}", DEFAULT_MINER_HOST, options.port);
    let rpc = NodeRpcServer::new(Arc::clone(&blockchain), &bind_address).await?;
    let worker = ChainWorker::new(Arc::clone(&blockchain), Arc::clone(&p2p)).start();

    info!(
        "Miner is ready on port {} (difficulty: {} bits, tracker: {})",
        options.port, options.target_bits, options.tracker_address
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down...");
    worker.stop().await;
    rpc.stop().await;

    Ok(())
}
