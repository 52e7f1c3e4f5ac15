use std::time::Duration;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// bind addresses
pub const DEFAULT_TRACKER_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_MINER_HOST: &str = "127.0.0.1";

// Block rules
// Number of pending posts absorbed into one mined block
pub const POSTS_PER_BLOCK: usize = 2;

// Mining difficulty: required leading zero bits of a header hash.
// Calibrated so a single machine mines a block in seconds; production
// would scale this far higher.
pub const DEFAULT_TARGET_BITS: u32 = 16;

// Nonce attempts per mining pass. Bounds how long one pass can starve
// request servicing; concurrent broadcasts preempt mining only at this
// boundary.
pub const MINING_ITERATIONS: u32 = 10_000;

// Background routine intervals. Each miner draws a fixed interval from
// these ranges at startup to desynchronize load across the fleet.
pub const HEARTBEAT_INTERVAL_MIN: Duration = Duration::from_millis(200);
pub const HEARTBEAT_INTERVAL_MAX: Duration = Duration::from_millis(400);
pub const SYNC_INTERVAL_MIN: Duration = Duration::from_millis(300);
pub const SYNC_INTERVAL_MAX: Duration = Duration::from_millis(600);

// Tracker entry lifetime. Must stay above HEARTBEAT_INTERVAL_MAX so a
// live miner renews before expiring.
pub const ENTRY_TIMEOUT: Duration = Duration::from_millis(500);

// How often the tracker purges expired entries
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(100);

// Grace window for in-flight requests on miner shutdown
pub const RPC_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
