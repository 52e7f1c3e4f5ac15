// Multi-node consensus scenarios driven directly against the state
// layer: gossip, mining, fork divergence and merge.

use std::sync::{Arc, OnceLock};

use scrawl_common::{
    crypto::{Hashable, KeyPair},
    post::{Post, PostBody, PostKey},
};
use scrawl_daemon::core::{
    blockchain::Blockchain,
    mining::try_mine,
};

const TEST_BITS: u32 = 8;
const POSTS_PER_BLOCK: usize = 2;

fn keypair() -> &'static KeyPair {
    static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();
    KEYPAIR.get_or_init(|| KeyPair::new().unwrap())
}

fn post(content: &str, timestamp: u64) -> Post {
    Post::sign(PostBody::new(content.to_owned(), timestamp), keypair()).unwrap()
}

// one peer pulls the other's pool, as /sync would deliver it
async fn gossip(from: &Blockchain, to: &Blockchain) {
    let posts: Vec<Post> = from
        .pool_snapshot()
        .await
        .iter()
        .map(|p| p.as_ref().clone())
        .collect();
    if !posts.is_empty() {
        to.sync_posts(posts).await.unwrap();
    }
}

// one bounded-but-generous mining attempt, committed like the worker does
async fn mine_one(node: &Blockchain) -> bool {
    let Some(job) = node.mining_job(POSTS_PER_BLOCK).await else {
        return false;
    };
    let height = job.height;
    match try_mine(&job, node.get_target_bits(), 1_000_000) {
        Some(block) => node.commit_block(block, height).await,
        None => false,
    }
}

async fn mine_until_pool_empty(node: &Blockchain) {
    while node.pool_len().await > 0 {
        assert!(mine_one(node).await);
    }
}

async fn chain_post_keys(node: &Blockchain) -> Vec<PostKey> {
    node.get_blocks()
        .await
        .iter()
        .flat_map(|block| block.get_posts().iter().map(|post| post.key()))
        .collect()
}

async fn assert_same_chain(a: &Blockchain, b: &Blockchain) {
    let (left, right) = (a.get_blocks().await, b.get_blocks().await);
    assert_eq!(left.len(), right.len());
    for (x, y) in left.iter().zip(right.iter()) {
        assert_eq!(x.hash(), y.hash());
    }
}

#[tokio::test]
async fn test_gossip_then_mine_converges_in_order() {
    let a = Blockchain::new(TEST_BITS);
    let b = Blockchain::new(TEST_BITS);

    // six users, half writing to each node
    for i in 0..3u64 {
        a.add_post(post(&format!("Hello world from {}", i), i + 1))
            .await
            .unwrap();
    }
    for i in 3..6u64 {
        b.add_post(post(&format!("Hello world from {}", i), i + 1))
            .await
            .unwrap();
    }

    gossip(&a, &b).await;
    gossip(&b, &a).await;
    assert_eq!(a.pool_len().await, 6);
    assert_eq!(b.pool_len().await, 6);

    mine_until_pool_empty(&a).await;
    assert_eq!(a.get_height().await, 3);

    // a's broadcast reaches b, which adopts the longer chain
    assert!(b.handle_broadcast(a.get_blocks().await).await);
    assert_same_chain(&a, &b).await;
    assert_eq!(b.pool_len().await, 0);

    // every post exactly once, in (timestamp, author) order
    let keys = chain_post_keys(&a).await;
    assert_eq!(keys.len(), 6);
    let mut sorted = keys.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(keys, sorted);
}

#[tokio::test]
async fn test_partition_diverges_then_merges_without_loss() {
    let a = Blockchain::new(TEST_BITS);
    let b = Blockchain::new(TEST_BITS);

    // partitioned: each side only sees its own writes
    a.add_post(post("side a #1", 1)).await.unwrap();
    a.add_post(post("side a #2", 2)).await.unwrap();
    b.add_post(post("side b #1", 3)).await.unwrap();

    assert!(mine_one(&a).await);
    assert!(mine_one(&b).await);

    // both at height 1 with different blocks: a real fork
    assert_eq!(a.get_height().await, 1);
    assert_eq!(b.get_height().await, 1);
    assert_ne!(
        a.get_blocks().await[0].hash(),
        b.get_blocks().await[0].hash()
    );

    // equal-length broadcasts change nothing on either side
    assert!(!a.handle_broadcast(b.get_blocks().await).await);
    assert!(!b.handle_broadcast(a.get_blocks().await).await);

    // the partition heals and a keeps writing
    a.add_post(post("side a #3", 4)).await.unwrap();
    assert!(mine_one(&a).await);
    assert_eq!(a.get_height().await, 2);

    // b switches to the longer chain; its own mined post is orphaned
    // back into the pool, not lost
    assert!(b.handle_broadcast(a.get_blocks().await).await);
    assert_eq!(b.get_height().await, 2);
    assert_eq!(b.pool_len().await, 1);
    let orphaned = b.pool_snapshot().await;
    assert_eq!(orphaned[0].get_body().get_content(), "side b #1");

    // b mines the orphan on top and a follows
    assert!(mine_one(&b).await);
    assert!(a.handle_broadcast(b.get_blocks().await).await);
    assert_same_chain(&a, &b).await;

    // all four posts present exactly once across the merged chain
    let mut keys = chain_post_keys(&a).await;
    assert_eq!(keys.len(), 4);
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 4);
}

#[tokio::test]
async fn test_three_nodes_settle_on_longest() {
    let nodes = [
        Blockchain::new(TEST_BITS),
        Blockchain::new(TEST_BITS),
        Blockchain::new(TEST_BITS),
    ];

    for i in 0..4u64 {
        nodes[0]
            .add_post(post(&format!("post {}", i), i + 1))
            .await
            .unwrap();
    }
    for peer in &nodes[1..] {
        gossip(&nodes[0], peer).await;
    }

    mine_until_pool_empty(&nodes[0]).await;
    let chain = nodes[0].get_blocks().await;
    for peer in &nodes[1..] {
        assert!(peer.handle_broadcast(chain.clone()).await);
    }

    for peer in &nodes[1..] {
        assert_same_chain(&nodes[0], peer).await;
        assert_eq!(peer.pool_len().await, 0);
    }
}

// sanity: Arc is what the state layer hands out, make sure nothing in
// these scenarios depended on uniqueness
#[tokio::test]
async fn test_pool_snapshot_is_shared_not_copied() {
    let node = Blockchain::new(TEST_BITS);
    node.add_post(post("arc", 1)).await.unwrap();

    let first = node.pool_snapshot().await;
    let second = node.pool_snapshot().await;
    assert!(Arc::ptr_eq(&first[0], &second[0]));
}
