//! `/dataset*`: the node's own records.

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use travlr_core::DataKey;

use super::AppState;

/// Body of `POST /dataset`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreDatasetRequest {
    #[serde(rename = "datasetId")]
    pub dataset_id: DataKey,
    pub data: Value,
}

fn error(status: actix_web::http::StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": message }))
}

fn internal(message: &str) -> HttpResponse {
    error(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub async fn store_dataset(
    state: web::Data<AppState>,
    req: web::Json<StoreDatasetRequest>,
) -> impl Responder {
    let StoreDatasetRequest { dataset_id, data } = req.into_inner();
    match state.node.put_dataset(&dataset_id, data).await {
        Ok(version) => {
            tracing::debug!(id = %dataset_id, version = version.version, "dataset stored");
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Err(e) => {
            tracing::warn!(id = %dataset_id, error = %e, "storing dataset failed");
            internal("Failed to store dataset")
        }
    }
}

pub async fn get_dataset(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = DataKey::from(path.into_inner());
    match state.node.get_dataset(&id).await {
        Ok(Some(dataset)) => HttpResponse::Ok().json(json!({ "dataset": dataset })),
        Ok(None) => error(actix_web::http::StatusCode::NOT_FOUND, "Dataset not found"),
        Err(e) => {
            tracing::warn!(%id, error = %e, "reading dataset failed");
            internal("Failed to retrieve dataset")
        }
    }
}

pub async fn list_datasets(state: web::Data<AppState>) -> impl Responder {
    match state.node.list_datasets().await {
        Ok(ids) => HttpResponse::Ok().json(json!({ "datasetList": ids })),
        Err(e) => {
            tracing::warn!(error = %e, "listing datasets failed");
            internal("Failed to list datasets")
        }
    }
}

/// Deleting an absent dataset succeeds.
pub async fn delete_dataset(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = DataKey::from(path.into_inner());
    match state.node.delete_dataset(&id).await {
        Ok(existed) => {
            tracing::debug!(%id, existed, "dataset deleted");
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Err(e) => {
            tracing::warn!(%id, error = %e, "deleting dataset failed");
            internal("Failed to delete dataset")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{json_body, state};
    use actix_web::test;

    #[actix_web::test]
    async fn test_store_then_get() {
        let state = state().await;
        let req = test::TestRequest::post().to_http_request();
        let body = StoreDatasetRequest {
            dataset_id: DataKey::from("trip-1"),
            data: json!({"from": "LIS", "to": "OPO"}),
        };
        let resp = store_dataset(state.clone(), web::Json(body)).await.respond_to(&req);
        assert_eq!(resp.status(), 200);

        let req = test::TestRequest::get().to_http_request();
        let resp = get_dataset(state, web::Path::from("trip-1".to_string()))
            .await
            .respond_to(&req);
        assert_eq!(resp.status(), 200);
        assert_eq!(json_body(resp).await["dataset"]["to"], "OPO");
    }

    #[actix_web::test]
    async fn test_missing_dataset_is_404() {
        let state = state().await;
        let req = test::TestRequest::get().to_http_request();
        let resp = get_dataset(state, web::Path::from("nope".to_string()))
            .await
            .respond_to(&req);
        assert_eq!(resp.status(), 404);
        assert_eq!(json_body(resp).await["error"], "Dataset not found");
    }

    #[actix_web::test]
    async fn test_delete_absent_succeeds() {
        let state = state().await;
        let req = test::TestRequest::delete().to_http_request();
        let resp = delete_dataset(state, web::Path::from("nope".to_string()))
            .await
            .respond_to(&req);
        assert_eq!(resp.status(), 200);
    }
}
