use std::{collections::BTreeMap, sync::Arc};

use scrawl_common::post::{Post, PostKey};

/// Pending posts, totally ordered by (timestamp, author key bytes) so
/// every miner iterates its pool in the same, peer-reproducible order.
#[derive(Default)]
pub struct Mempool {
    posts: BTreeMap<PostKey, Arc<Post>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self {
            posts: BTreeMap::new(),
        }
    }

    pub fn contains(&self, key: &PostKey) -> bool {
        self.posts.contains_key(key)
    }

    /// Insert a post; returns false if it was already pooled.
    pub fn insert(&mut self, post: Arc<Post>) -> bool {
        self.posts.insert(post.key(), post).is_none()
    }

    pub fn remove(&mut self, key: &PostKey) -> Option<Arc<Post>> {
        self.posts.remove(key)
    }

    pub fn retain<F: FnMut(&PostKey) -> bool>(&mut self, mut keep: F) {
        self.posts.retain(|key, _| keep(key));
    }

    /// The oldest `count` posts in pool order.
    pub fn first(&self, count: usize) -> Vec<Arc<Post>> {
        self.posts.values().take(count).cloned().collect()
    }

    /// Every pooled post, in pool order.
    pub fn snapshot(&self) -> Vec<Arc<Post>> {
        self.posts.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrawl_common::{crypto::KeyPair, post::PostBody};
    use std::sync::OnceLock;

    fn keypair() -> &'static KeyPair {
        static KEYPAIR: OnceLock<KeyPair> = OnceLock::new();
        KEYPAIR.get_or_init(|| KeyPair::new().unwrap())
    }

    fn post(content: &str, timestamp: u64) -> Arc<Post> {
        Arc::new(Post::sign(PostBody::new(content.to_owned(), timestamp), keypair()).unwrap())
    }

    #[test]
    fn test_insert_and_duplicate() {
        let mut pool = Mempool::new();
        let p = post("a", 1);
        assert!(pool.insert(p.clone()));
        assert!(!pool.insert(p));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_iteration_order_is_timestamp_first() {
        let mut pool = Mempool::new();
        pool.insert(post("late", 30));
        pool.insert(post("early", 10));
        pool.insert(post("middle", 20));

        let ordered: Vec<u64> = pool
            .snapshot()
            .iter()
            .map(|p| p.get_body().get_timestamp())
            .collect();
        assert_eq!(ordered, vec![10, 20, 30]);
    }

    #[test]
    fn test_first_takes_oldest() {
        let mut pool = Mempool::new();
        for timestamp in [5u64, 3, 9, 1] {
            pool.insert(post("x", timestamp));
        }

        let oldest = pool.first(2);
        assert_eq!(oldest.len(), 2);
        assert_eq!(oldest[0].get_body().get_timestamp(), 1);
        assert_eq!(oldest[1].get_body().get_timestamp(), 3);
    }

    #[test]
    fn test_same_timestamp_orders_by_author() {
        let other = KeyPair::new().unwrap();
        let a = Arc::new(Post::sign(PostBody::new("a".into(), 7), keypair()).unwrap());
        let b = Arc::new(Post::sign(PostBody::new("b".into(), 7), &other).unwrap());

        let mut pool = Mempool::new();
        pool.insert(a.clone());
        pool.insert(b.clone());

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[0].key() < snapshot[1].key());
    }
}
