use std::{collections::BTreeMap, sync::Arc};

use log::{debug, info};
use tokio::sync::RwLock;

use scrawl_common::{
    block::Block,
    crypto::{Hash, Hashable},
    post::{Post, PostKey},
};

use super::{
    chain_validator::verify_chain,
    error::{BlockchainError, BlockchainResult},
    mempool::Mempool,
    mining::MiningJob,
};

// Everything a request handler may mutate lives here, behind one
// reader-writer lock: the chain, the accepted-post index and the pool.
// Read-only endpoints and the mining pre-phase take the shared lock;
// writes and the mining commit take the exclusive lock. Network I/O
// never happens while a lock is held.
struct ChainState {
    blocks: Vec<Block>,
    // posts currently on the chain, for O(log n) duplicate rejection
    accepted: BTreeMap<PostKey, Arc<Post>>,
    mempool: Mempool,
}

impl ChainState {
    fn tip_hash(&self) -> Hash {
        self.blocks
            .last()
            .map(|block| block.hash())
            .unwrap_or_else(Hash::zero)
    }

    fn knows(&self, key: &PostKey) -> bool {
        self.accepted.contains_key(key) || self.mempool.contains(key)
    }

    // Adopt a longer valid chain. Posts orphaned by the switch go back
    // to the pool unless the new chain carries them; pooled posts now
    // accepted leave the pool.
    fn replace_chain(&mut self, chain: Vec<Block>) {
        let mut accepted = BTreeMap::new();
        for block in &chain {
            for post in block.get_posts() {
                accepted.insert(post.key(), Arc::clone(post));
            }
        }

        for block in &self.blocks {
            for post in block.get_posts() {
                if !accepted.contains_key(&post.key()) {
                    self.mempool.insert(Arc::clone(post));
                }
            }
        }

        self.mempool.retain(|key| !accepted.contains_key(key));
        self.accepted = accepted;
        self.blocks = chain;
    }
}

pub struct Blockchain {
    state: RwLock<ChainState>,
    target_bits: u32,
}

impl Blockchain {
    pub fn new(target_bits: u32) -> Self {
        Self {
            state: RwLock::new(ChainState {
                blocks: Vec::new(),
                accepted: BTreeMap::new(),
                mempool: Mempool::new(),
            }),
            target_bits,
        }
    }

    pub fn get_target_bits(&self) -> u32 {
        self.target_bits
    }

    /// Full chain, oldest block first.
    pub async fn get_blocks(&self) -> Vec<Block> {
        self.state.read().await.blocks.clone()
    }

    pub async fn get_height(&self) -> usize {
        self.state.read().await.blocks.len()
    }

    pub async fn pool_len(&self) -> usize {
        self.state.read().await.mempool.len()
    }

    /// The pool in iteration order, for gossip.
    pub async fn pool_snapshot(&self) -> Vec<Arc<Post>> {
        self.state.read().await.mempool.snapshot()
    }

    /// Admit a user post to the pool.
    pub async fn add_post(&self, post: Post) -> BlockchainResult<()> {
        if !post.verify() {
            return Err(BlockchainError::InvalidPostSignature);
        }

        let mut state = self.state.write().await;
        if state.knows(&post.key()) {
            return Err(BlockchainError::DuplicatePost);
        }

        debug!("pooling {}", post);
        state.mempool.insert(Arc::new(post));
        Ok(())
    }

    /// Admit a batch of posts from a peer. The whole batch is rejected if
    /// any signature fails; posts already known are silently skipped.
    pub async fn sync_posts(&self, posts: Vec<Post>) -> BlockchainResult<usize> {
        if !posts.iter().all(Post::verify) {
            return Err(BlockchainError::InvalidPostSignature);
        }

        let mut state = self.state.write().await;
        let mut inserted = 0;
        for post in posts {
            if !state.knows(&post.key()) {
                state.mempool.insert(Arc::new(post));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Consider a full chain offered by a peer. Adopts it iff strictly
    /// longer than the local chain and fully valid; anything else is
    /// ignored so byzantine peers cannot destabilize us. Returns whether
    /// the chain was adopted.
    pub async fn handle_broadcast(&self, chain: Vec<Block>) -> bool {
        let mut state = self.state.write().await;

        if chain.len() <= state.blocks.len() {
            debug!(
                "ignoring broadcast of length {} against local {}",
                chain.len(),
                state.blocks.len()
            );
            return false;
        }

        if let Err(e) = verify_chain(&chain, self.target_bits) {
            debug!("ignoring invalid broadcast chain: {}", e);
            return false;
        }

        info!(
            "switching to received chain of length {} (was {})",
            chain.len(),
            state.blocks.len()
        );
        state.replace_chain(chain);
        true
    }

    /// Snapshot the inputs of one mining attempt under the shared lock.
    /// Returns None when there is nothing to mine.
    pub async fn mining_job(&self, posts_per_block: usize) -> Option<MiningJob> {
        let state = self.state.read().await;
        if state.mempool.is_empty() {
            return None;
        }

        Some(MiningJob {
            height: state.blocks.len(),
            prev_hash: state.tip_hash(),
            posts: state.mempool.first(posts_per_block),
        })
    }

    /// Commit a locally mined block. The proof of work ran without the
    /// lock, so the commit only succeeds if the chain length still equals
    /// the mining snapshot; otherwise the block is discarded and its
    /// posts stay pooled.
    pub async fn commit_block(&self, block: Block, snapshot_height: usize) -> bool {
        let mut state = self.state.write().await;
        if state.blocks.len() != snapshot_height {
            debug!(
                "discarding mined block, chain advanced to {} during proof of work",
                state.blocks.len()
            );
            return false;
        }

        debug_assert_eq!(block.get_header().get_prev_hash(), &state.tip_hash());

        for post in block.get_posts() {
            let key = post.key();
            state.mempool.remove(&key);
            state.accepted.insert(key, Arc::clone(post));
        }
        state.blocks.push(block);
        true
    }

    /// Debug invariant: the pool and the accepted index never overlap.
    #[cfg(test)]
    pub async fn pool_and_index_disjoint(&self) -> bool {
        let state = self.state.read().await;
        state
            .accepted
            .keys()
            .all(|key| !state.mempool.contains(key))
    }
}
