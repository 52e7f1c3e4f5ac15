use std::sync::Arc;

use actix_web::{
    dev::ServerHandle,
    get, post,
    web::{Data, Json},
    App, HttpResponse, HttpServer, Responder,
};
use anyhow::Context;
use log::{info, warn};
use tokio::sync::Mutex;

use scrawl_common::{
    api::{ErrorResponse, PartitionRequest, PortsResponse, RegisterRequest},
    config,
};

use crate::registry::Registry;

pub type SharedTrackerRpcServer = Arc<TrackerRpcServer>;

pub struct TrackerRpcServer {
    handle: Mutex<Option<ServerHandle>>,
}

impl TrackerRpcServer {
    pub async fn new(
        registry: Arc<Registry>,
        bind_address: &str,
    ) -> Result<SharedTrackerRpcServer, anyhow::Error> {
        info!("Starting tracker on {}", bind_address);

        let server = Arc::new(Self {
            handle: Mutex::new(None),
        });

        let http_server = HttpServer::new(move || {
            App::new()
                .app_data(Data::from(Arc::clone(&registry)))
                .service(register)
                .service(get_miners)
                .service(partition)
                .service(index)
        })
        .disable_signals()
        .bind(bind_address)
        .with_context(|| format!("Failed to bind tracker on {}", bind_address))?
        .run();

        {
            let handle = http_server.handle();
            let mut lock = server.handle.lock().await;
            *lock = Some(handle);
        }
        tokio::spawn(http_server);

        Ok(server)
    }

    pub async fn stop(&self) {
        info!("Stopping tracker...");
        let mut handle = self.handle.lock().await;
        if let Some(handle) = handle.take() {
            handle.stop(false).await;
            info!("Tracker is now stopped!");
        } else {
            warn!("Tracker is not running!");
        }
    }
}

// Renew the caller's entry and answer with the live set
#[post("/register")]
async fn register(registry: Data<Registry>, body: Json<RegisterRequest>) -> impl Responder {
    let ports = registry.register(body.port).await;
    HttpResponse::Ok().json(PortsResponse { ports })
}

#[get("/get_miners")]
async fn get_miners(registry: Data<Registry>) -> impl Responder {
    let ports = registry.live_ports().await;
    if ports.is_empty() {
        return HttpResponse::NotFound().json(ErrorResponse {
            error: "no live miners".to_owned(),
        });
    }
    HttpResponse::Ok().json(PortsResponse { ports })
}

// Harness-only switch: split the answer set by port parity
#[post("/partition")]
async fn partition(registry: Data<Registry>, body: Json<PartitionRequest>) -> impl Responder {
    registry.set_partitioned(body.enabled);
    HttpResponse::Ok().finish()
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body(format!("scrawl tracker\nRunning on: {}", config::VERSION))
}
