//! Shared request/response types for the HTTP wire.
//!
//! Binary payloads (posts, blocks) travel as base64 of their canonical
//! bytes inside JSON; decoding failures surface as request rejections.

use serde::{Deserialize, Serialize};

use crate::{
    block::Block,
    post::Post,
    serializer::{ReaderError, Serializer},
};

/// Tracker: register a miner and renew its entry.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub port: u16,
}

/// Tracker: the currently-live miner set.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PortsResponse {
    pub ports: Vec<u16>,
}

/// Tracker (harness only): toggle the parity partition.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PartitionRequest {
    pub enabled: bool,
}

/// Miner: a batch of pending posts gossiped between peers.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SyncRequest {
    pub posts: Vec<String>,
}

/// Miner: a full chain, served by /read and offered via /broadcast.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChainPayload {
    pub blockchain: Vec<String>,
}

/// Error body attached to non-200 responses.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn encode_posts<'a, I: IntoIterator<Item = &'a Post>>(posts: I) -> Vec<String> {
    posts.into_iter().map(|post| post.to_base64()).collect()
}

pub fn decode_posts(encoded: &[String]) -> Result<Vec<Post>, ReaderError> {
    encoded.iter().map(|value| Post::from_base64(value)).collect()
}

pub fn encode_chain<'a, I: IntoIterator<Item = &'a Block>>(blocks: I) -> Vec<String> {
    blocks.into_iter().map(|block| block.to_base64()).collect()
}

pub fn decode_chain(encoded: &[String]) -> Result<Vec<Block>, ReaderError> {
    encoded.iter().map(|value| Block::from_base64(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::KeyPair, post::PostBody};

    #[test]
    fn test_posts_wire_roundtrip() {
        let keypair = KeyPair::new().unwrap();
        let posts = vec![
            Post::sign(PostBody::new("a".into(), 1), &keypair).unwrap(),
            Post::sign(PostBody::new("b".into(), 2), &keypair).unwrap(),
        ];

        let encoded = encode_posts(posts.iter());
        let decoded = decode_posts(&encoded).unwrap();
        assert_eq!(posts, decoded);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_posts(&["@@@".to_owned()]).is_err());
        assert!(decode_chain(&["@@@".to_owned()]).is_err());
    }

    #[test]
    fn test_json_shape() {
        let payload = ChainPayload {
            blockchain: vec!["AAAA".into()],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"blockchain":["AAAA"]}"#);
    }
}
