//! Proof of work and the per-miner background routine.
//!
//! The routine interleaves three duties in one task: tracker heartbeat,
//! pool gossip, and bounded mining attempts. Mining snapshots its inputs
//! under the shared lock, searches nonces without any lock, and commits
//! under the exclusive lock only if the chain did not advance meanwhile.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use rand::{thread_rng, Rng};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep, Instant},
};

use scrawl_common::{
    block::{summary_hash, Block, BlockHeader},
    config::{
        HEARTBEAT_INTERVAL_MAX, HEARTBEAT_INTERVAL_MIN, MINING_ITERATIONS, POSTS_PER_BLOCK,
        SYNC_INTERVAL_MAX, SYNC_INTERVAL_MIN,
    },
    crypto::{Hash, Hashable},
    difficulty::check_difficulty,
    post::Post,
    time::get_current_time_in_millis,
};

use super::blockchain::Blockchain;
use crate::{config::IDLE_POLL_INTERVAL, p2p::P2p};

/// Inputs of one mining attempt, snapshotted under the shared lock.
/// `height` backs the optimistic commit check.
pub struct MiningJob {
    pub height: usize,
    pub prev_hash: Hash,
    pub posts: Vec<Arc<Post>>,
}

/// One bounded nonce search. Returns the mined block on success, None
/// once the iteration budget is exhausted.
pub fn try_mine(job: &MiningJob, target_bits: u32, iterations: u32) -> Option<Block> {
    let mut rng = thread_rng();
    let mut header = BlockHeader::new(
        job.prev_hash.clone(),
        summary_hash(&job.posts),
        get_current_time_in_millis(),
    );

    for _ in 0..iterations {
        header.set_nonce(rng.gen());
        if check_difficulty(&header.hash(), target_bits) {
            return Some(Block::new(header, job.posts.clone()));
        }
    }

    None
}

pub struct ChainWorker {
    blockchain: Arc<Blockchain>,
    p2p: Arc<P2p>,
    heartbeat_interval: Duration,
    sync_interval: Duration,
}

impl ChainWorker {
    /// Intervals are drawn once per miner to desynchronize load across
    /// the fleet.
    pub fn new(blockchain: Arc<Blockchain>, p2p: Arc<P2p>) -> Self {
        let mut rng = thread_rng();
        let heartbeat_interval = rng.gen_range(HEARTBEAT_INTERVAL_MIN..=HEARTBEAT_INTERVAL_MAX);
        let sync_interval = rng.gen_range(SYNC_INTERVAL_MIN..=SYNC_INTERVAL_MAX);

        debug!(
            "worker intervals: heartbeat {:?}, sync {:?}",
            heartbeat_interval, sync_interval
        );

        Self {
            blockchain,
            p2p,
            heartbeat_interval,
            sync_interval,
        }
    }

    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        WorkerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: mpsc::Receiver<()>) {
        // register right away so we learn our peers before mining
        let mut next_heartbeat = Instant::now();
        let mut next_sync = Instant::now() + self.sync_interval;

        loop {
            // shutdown is observed between sub-steps, never mid-network-call
            if shutdown.try_recv().is_ok() {
                break;
            }

            let now = Instant::now();
            if now >= next_heartbeat {
                self.heartbeat().await;
                next_heartbeat = now + self.heartbeat_interval;
            }

            let now = Instant::now();
            if now >= next_sync {
                self.gossip().await;
                next_sync = now + self.sync_interval;
            }

            self.mine_once().await;
            tokio::task::yield_now().await;
        }

        debug!("worker stopped");
    }

    async fn heartbeat(&self) {
        match self.p2p.register().await {
            Ok(peers) => trace!("heartbeat ok, {} peers", peers),
            // transient: the next heartbeat retries
            Err(e) => warn!("heartbeat failed: {}", e),
        }
    }

    async fn gossip(&self) {
        // snapshot under the lock, send without it
        let posts = self.blockchain.pool_snapshot().await;
        if posts.is_empty() {
            return;
        }

        trace!("gossiping {} pending posts", posts.len());
        self.p2p.gossip_posts(&posts).await;
    }

    async fn mine_once(&self) {
        let Some(job) = self.blockchain.mining_job(POSTS_PER_BLOCK).await else {
            // nothing to mine, don't spin
            sleep(IDLE_POLL_INTERVAL).await;
            return;
        };

        let height = job.height;
        let Some(block) = try_mine(&job, self.blockchain.get_target_bits(), MINING_ITERATIONS)
        else {
            // budget exhausted, give request handlers their turn
            return;
        };

        if self.blockchain.commit_block(block.clone(), height).await {
            info!("mined {} at height {}", block, height);
            let blocks = self.blockchain.get_blocks().await;
            self.p2p.broadcast_chain(&blocks).await;
        }
        // on a failed commit the posts simply stay pooled
    }
}

pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the routine and wait for it to exit. The current mining
    /// pass finishes its iteration budget before the signal is seen.
    pub async fn stop(self) {
        let _ = self.shutdown.send(()).await;
        if let Err(e) = self.task.await {
            warn!("worker task ended abnormally: {}", e);
        }
    }
}
