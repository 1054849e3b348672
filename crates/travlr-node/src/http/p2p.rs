//! `/p2p/*`: peer identity, dialing, and data requests.

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;

use travlr_core::{DataKey, Did};

use super::AppState;

/// Body of `POST /p2p/connect`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub multiaddr: String,
}

/// Body of `POST /p2p/request-data`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestDataRequest {
    #[serde(rename = "dataKey")]
    pub data_key: DataKey,
    #[serde(rename = "requesterDID")]
    pub requester: Did,
}

/// Outcome body shared by the p2p write routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    fn ok(message: String) -> HttpResponse {
        HttpResponse::Ok().json(Self {
            success: true,
            message,
        })
    }

    fn failed(message: String) -> HttpResponse {
        HttpResponse::InternalServerError().json(Self {
            success: false,
            message,
        })
    }
}

pub async fn peer_id(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "peerId": state.node.peer_id().to_hex() }))
}

pub async fn multiaddrs(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "multiaddrs": state.node.listen_addrs() }))
}

pub async fn connect(state: web::Data<AppState>, req: web::Json<ConnectRequest>) -> impl Responder {
    let addr = &req.multiaddr;
    match state.node.connect(addr).await {
        Ok(_) => StatusResponse::ok(format!("Connected to {}", addr)),
        Err(e) => {
            tracing::warn!(addr = %addr, error = %e, "connect failed");
            StatusResponse::failed(format!("Failed to connect to {}", addr))
        }
    }
}

pub async fn request_data(
    state: web::Data<AppState>,
    req: web::Json<RequestDataRequest>,
) -> impl Responder {
    match state
        .node
        .request_data_detached(&req.requester, &req.data_key)
        .await
    {
        Ok(()) => StatusResponse::ok(format!("Data request sent for {}", req.data_key)),
        Err(e) => {
            tracing::warn!(key = %req.data_key, error = %e, "data request failed");
            StatusResponse::failed(format!("Failed to request data for {}", req.data_key))
        }
    }
}
