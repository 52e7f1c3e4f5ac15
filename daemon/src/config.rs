use std::time::Duration;

use clap::Parser;
use log::LevelFilter;

use scrawl_common::config::{DEFAULT_TARGET_BITS, DEFAULT_TRACKER_BIND_ADDRESS};

// How long the background routine naps when the pool is empty; bounds
// shutdown latency while keeping the idle loop off the CPU.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[clap(version = scrawl_common::config::VERSION, about = "Scrawl miner node")]
pub struct NodeOptions {
    /// Port to serve the miner API on; doubles as our network identity
    #[clap(long)]
    pub port: u16,

    /// host:port of the tracker
    #[clap(long, default_value = DEFAULT_TRACKER_BIND_ADDRESS)]
    pub tracker_address: String,

    /// Required leading zero bits of a block header hash
    #[clap(long, default_value_t = DEFAULT_TARGET_BITS)]
    pub target_bits: u32,

    /// Log level (off, error, warn, info, debug, trace)
    #[clap(long, default_value = "info")]
    pub log_level: LevelFilter,
}
