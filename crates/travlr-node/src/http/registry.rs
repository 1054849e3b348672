//! Registry service routes, served to [`RestGateway`](travlr_gateway::RestGateway) clients.
//!
//! Every route goes through the node's [`MirroredRegistry`](travlr_gateway::MirroredRegistry),
//! so a node backed by a local gateway acts as the system of record for its peers.

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use travlr_access::Role;
use travlr_gateway::wire::{
    routes, AccessAnswer, CheckAccess, DataForwarding, Delegation, DelegationAnswer, GrantAccess,
    RegisterNode, RevokeAccess, TransactionReceipt,
};
use travlr_gateway::{GatewayError, TransactionId};

use super::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(routes::REGISTER_NODE, web::post().to(register_node))
        .route(routes::GRANT_ACCESS, web::post().to(grant_access))
        .route(routes::REVOKE_ACCESS, web::post().to(revoke_access))
        .route(routes::ADD_DELEGATION, web::post().to(add_delegation))
        .route(routes::REMOVE_DELEGATION, web::post().to(remove_delegation))
        .route(routes::REQUEST_DATA_FORWARDING, web::post().to(request_data_forwarding))
        .route(routes::CHECK_ACCESS, web::get().to(check_access))
        .route(routes::CHECK_DELEGATION, web::get().to(check_delegation));
}

fn receipt(route: &str, result: Result<TransactionId, GatewayError>) -> HttpResponse {
    match result {
        Ok(transaction_id) => HttpResponse::Ok().json(TransactionReceipt { transaction_id }),
        Err(e) => {
            tracing::warn!(route, error = %e, "registry write failed");
            HttpResponse::InternalServerError().json(json!({ "error": "Registry operation failed" }))
        }
    }
}

pub async fn register_node(state: web::Data<AppState>, req: web::Json<RegisterNode>) -> impl Responder {
    let role = Role::from_is_organization(req.is_organization);
    let result = state.node.registry().register_principal(&req.did, role).await;
    receipt(routes::REGISTER_NODE, result)
}

pub async fn grant_access(state: web::Data<AppState>, req: web::Json<GrantAccess>) -> impl Responder {
    let result = state
        .node
        .registry()
        .grant_access(&req.granter, &req.grantee, &req.data_key, req.expires_at)
        .await;
    receipt(routes::GRANT_ACCESS, result)
}

pub async fn revoke_access(state: web::Data<AppState>, req: web::Json<RevokeAccess>) -> impl Responder {
    let result = state
        .node
        .registry()
        .revoke_access(&req.revoker, &req.grantee, &req.data_key)
        .await;
    receipt(routes::REVOKE_ACCESS, result)
}

pub async fn add_delegation(state: web::Data<AppState>, req: web::Json<Delegation>) -> impl Responder {
    let result = state
        .node
        .registry()
        .add_delegation(&req.from, &req.to, &req.data_key)
        .await;
    receipt(routes::ADD_DELEGATION, result)
}

pub async fn remove_delegation(state: web::Data<AppState>, req: web::Json<Delegation>) -> impl Responder {
    let result = state
        .node
        .registry()
        .remove_delegation(&req.from, &req.to, &req.data_key)
        .await;
    receipt(routes::REMOVE_DELEGATION, result)
}

pub async fn request_data_forwarding(
    state: web::Data<AppState>,
    req: web::Json<DataForwarding>,
) -> impl Responder {
    let result = state
        .node
        .registry()
        .request_data_forwarding(&req.requester, &req.target, &req.data_key)
        .await;
    receipt(routes::REQUEST_DATA_FORWARDING, result)
}

pub async fn check_access(state: web::Data<AppState>, query: web::Query<CheckAccess>) -> impl Responder {
    match state.node.registry().refresh_access(&query.did, &query.data_key).await {
        Ok(has_access) => HttpResponse::Ok().json(AccessAnswer { has_access }),
        Err(e) => {
            tracing::warn!(error = %e, "access check failed");
            HttpResponse::InternalServerError().json(json!({ "error": "Access check failed" }))
        }
    }
}

pub async fn check_delegation(state: web::Data<AppState>, query: web::Query<Delegation>) -> impl Responder {
    match state
        .node
        .registry()
        .check_delegation(&query.from, &query.to, &query.data_key)
        .await
    {
        Ok(has_delegation) => HttpResponse::Ok().json(DelegationAnswer { has_delegation }),
        Err(e) => {
            tracing::warn!(error = %e, "delegation check failed");
            HttpResponse::InternalServerError().json(json!({ "error": "Delegation check failed" }))
        }
    }
}
