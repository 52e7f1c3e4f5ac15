//! Outbound side of the miner: tracker heartbeat and peer fan-out.
//!
//! Peers are addressed by port alone, all on the loopback host. Every
//! payload is serialized before any request is issued, and failures are
//! logged and dropped; liveness comes back with the next interval.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use indexmap::IndexSet;
use log::{debug, warn};
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use scrawl_common::{
    api::{encode_chain, encode_posts, ChainPayload, PortsResponse, RegisterRequest, SyncRequest},
    block::Block,
    config::DEFAULT_MINER_HOST,
    post::Post,
};

// generous for loopback; a peer slower than this is as good as down
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum P2pError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Tracker answered with status {0}")]
    TrackerStatus(StatusCode),
}

pub struct P2p {
    client: reqwest::Client,
    tracker_address: String,
    // our own RPC port; also our identity on the network
    port: u16,
    peers: RwLock<IndexSet<u16>>,
}

impl P2p {
    pub fn new(tracker_address: String, port: u16) -> Result<Self, P2pError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            tracker_address,
            port,
            peers: RwLock::new(IndexSet::new()),
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Register with the tracker and replace the peer list with the
    /// answer, excluding ourselves. Returns the new peer count.
    pub async fn register(&self) -> Result<usize, P2pError> {
        let url = format!("http://{}/register", self.tracker_address);
        let response = self
            .client
            .post(&url)
            .json(&RegisterRequest { port: self.port })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(P2pError::TrackerStatus(response.status()));
        }

        let body: PortsResponse = response.json().await?;
        let peers: IndexSet<u16> = body
            .ports
            .into_iter()
            .filter(|port| *port != self.port)
            .collect();
        let count = peers.len();
        *self.peers.write().await = peers;
        Ok(count)
    }

    pub async fn get_peers(&self) -> Vec<u16> {
        self.peers.read().await.iter().copied().collect()
    }

    /// Send the pool snapshot to every known peer in parallel.
    pub async fn gossip_posts(&self, posts: &[Arc<Post>]) {
        let request = SyncRequest {
            posts: encode_posts(posts.iter().map(Arc::as_ref)),
        };
        self.fan_out("sync", &request).await;
    }

    /// Offer the full chain to every known peer in parallel.
    pub async fn broadcast_chain(&self, blocks: &[Block]) {
        let payload = ChainPayload {
            blockchain: encode_chain(blocks.iter()),
        };
        self.fan_out("broadcast", &payload).await;
    }

    async fn fan_out<T: Serialize>(&self, path: &str, body: &T) {
        let peers = self.get_peers().await;
        if peers.is_empty() {
            return;
        }

        let requests = peers.into_iter().map(|peer| {
            let url = format!("http://{}:{}/{}", DEFAULT_MINER_HOST, peer, path);
            let request = self.client.post(url).json(body);
            async move {
                match request.send().await {
                    Ok(response) if !response.status().is_success() => {
                        debug!("peer {} answered /{} with {}", peer, path, response.status())
                    }
                    Ok(_) => {}
                    Err(e) => warn!("failed to reach peer {} for /{}: {}", peer, path, e),
                }
            }
        });

        join_all(requests).await;
    }
}
