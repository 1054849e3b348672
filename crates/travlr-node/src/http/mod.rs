//! HTTP surface of the node.
//!
//! Peer and dataset routes are always mounted. The registry service routes
//! that [`RestGateway`](travlr_gateway::RestGateway) consumes are mounted
//! when `api.serve_registry` is set.
//!
//! Infrastructure failures are logged and answered with a generic 500 body;
//! their detail never reaches the caller.

pub mod dataset;
pub mod p2p;
pub mod registry;

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};

use crate::node::Node;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
}

/// Register the routes on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig, serve_registry: bool) {
    cfg.route("/p2p/id", web::get().to(p2p::peer_id))
        .route("/p2p/multiaddrs", web::get().to(p2p::multiaddrs))
        .route("/p2p/connect", web::post().to(p2p::connect))
        .route("/p2p/request-data", web::post().to(p2p::request_data))
        .route("/dataset", web::post().to(dataset::store_dataset))
        // Before `/dataset/{id}` so "list" is not taken for an id.
        .route("/dataset/list", web::get().to(dataset::list_datasets))
        .route("/dataset/{id}", web::get().to(dataset::get_dataset))
        .route("/dataset/{id}", web::delete().to(dataset::delete_dataset));

    if serve_registry {
        registry::configure(cfg);
    }
}

/// An HTTP server bound and ready to run.
pub struct ApiServer {
    server: Server,
    addr: SocketAddr,
}

impl ApiServer {
    /// Bind `node.config().api.bind`.
    pub fn bind(node: Arc<Node>) -> std::io::Result<Self> {
        let bind = node.config().api.bind.clone();
        let serve_registry = node.config().api.serve_registry;
        let state = web::Data::new(AppState { node });

        let http = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .configure(|cfg| configure(cfg, serve_registry))
        })
        .bind(&bind)?;

        let addr = http.addrs().first().copied().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no listen address")
        })?;

        tracing::info!(%addr, serve_registry, "HTTP API listening");
        Ok(Self {
            server: http.run(),
            addr,
        })
    }

    /// The bound address. Useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle for stopping the server from elsewhere.
    pub fn handle(&self) -> actix_web::dev::ServerHandle {
        self.server.handle()
    }

    /// Serve until stopped.
    pub async fn run(self) -> std::io::Result<()> {
        self.server.await
    }

    /// The underlying server future, for spawning.
    pub fn into_server(self) -> Server {
        self.server
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use actix_web::body::{to_bytes, MessageBody};
    use actix_web::HttpResponse;

    use travlr_exchange::MemoryNetwork;
    use travlr_gateway::LocalGateway;
    use travlr_store::MemoryStore;

    use super::*;
    use crate::config::NodeConfig;

    pub async fn state() -> web::Data<AppState> {
        let network = MemoryNetwork::new();
        let node = Node::with_parts(
            NodeConfig::default(),
            Arc::new(LocalGateway::default()),
            Arc::new(MemoryStore::new()),
            Arc::new(network.join().await),
        );
        web::Data::new(AppState {
            node: Arc::new(node),
        })
    }

    pub async fn json_body<B: MessageBody + 'static>(resp: HttpResponse<B>) -> serde_json::Value {
        let bytes = to_bytes(resp.map_into_boxed_body().into_body())
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
