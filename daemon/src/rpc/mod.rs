pub mod handlers;

use std::sync::Arc;

use actix_web::{
    dev::ServerHandle,
    get,
    web::Data,
    App, HttpResponse, HttpServer, Responder,
};
use anyhow::Context;
use log::{info, warn};
use tokio::sync::Mutex;

use scrawl_common::config::{RPC_SHUTDOWN_TIMEOUT, VERSION};

use crate::core::blockchain::Blockchain;

pub type SharedNodeRpcServer = Arc<NodeRpcServer>;

pub struct NodeRpcServer {
    handle: Mutex<Option<ServerHandle>>,
}

impl NodeRpcServer {
    pub async fn new(
        blockchain: Arc<Blockchain>,
        bind_address: &str,
    ) -> Result<SharedNodeRpcServer, anyhow::Error> {
        info!("Starting RPC server on {}", bind_address);

        let server = Arc::new(Self {
            handle: Mutex::new(None),
        });

        let http_server = HttpServer::new(move || {
            App::new()
                .app_data(Data::from(Arc::clone(&blockchain)))
                .service(handlers::read)
                .service(handlers::write)
                .service(handlers::sync)
                .service(handlers::broadcast)
                .service(index)
        })
        .disable_signals()
        .shutdown_timeout(RPC_SHUTDOWN_TIMEOUT.as_secs())
        .bind(bind_address)
        .with_context(|| format!("Failed to bind RPC server on {}", bind_address))?
        .run();

        {
            let handle = http_server.handle();
            let mut lock = server.handle.lock().await;
            *lock = Some(handle);
        }
        tokio::spawn(http_server);

        Ok(server)
    }

    /// Graceful stop: in-flight requests get the shutdown grace window.
    pub async fn stop(&self) {
        info!("Stopping RPC server...");
        let mut handle = self.handle.lock().await;
        if let Some(handle) = handle.take() {
            handle.stop(true).await;
            info!("RPC server is now stopped!");
        } else {
            warn!("RPC server is not running!");
        }
    }
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(format!("scrawl miner\nRunning on: {}", VERSION))
}
