//! End-to-end tests of the HTTP surface through the actix service.

use std::sync::Arc;

use actix_web::{test, web, App};
use serde_json::{json, Value};

use travlr_exchange::MemoryNetwork;
use travlr_gateway::LocalGateway;
use travlr_node::http::{configure, AppState};
use travlr_node::{Node, NodeConfig};
use travlr_store::{FileStore, MemoryStore};
use travlr_testkit::Principals;

async fn node(network: &Arc<MemoryNetwork>) -> Arc<Node> {
    let mut config = NodeConfig::default();
    config.exchange.request_timeout_ms = 500;
    Arc::new(Node::with_parts(
        config,
        Arc::new(LocalGateway::default()),
        Arc::new(MemoryStore::new()),
        Arc::new(network.join().await),
    ))
}

macro_rules! service {
    ($node:expr, $serve_registry:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { node: $node }))
                .configure(|cfg| configure(cfg, $serve_registry)),
        )
        .await
    };
}

#[actix_web::test]
async fn dataset_routes_round_trip() {
    let network = MemoryNetwork::new();
    let app = service!(node(&network).await, false);

    for (id, data) in [("trip-1", json!({"to": "OPO"})), ("trip-2", json!({"to": "FAO"}))] {
        let req = test::TestRequest::post()
            .uri("/dataset")
            .set_json(json!({ "datasetId": id, "data": data }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "success": true }));
    }

    // "list" must not be routed as an id.
    let req = test::TestRequest::get().uri("/dataset/list").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "datasetList": ["trip-1", "trip-2"] }));

    let req = test::TestRequest::get().uri("/dataset/trip-2").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "dataset": { "to": "FAO" } }));

    let req = test::TestRequest::delete().uri("/dataset/trip-2").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get().uri("/dataset/trip-2").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn unstorable_dataset_id_reads_as_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let network = MemoryNetwork::new();
    let node = Arc::new(Node::with_parts(
        NodeConfig::default(),
        Arc::new(LocalGateway::default()),
        Arc::new(FileStore::open(dir.path()).await.unwrap()),
        Arc::new(network.join().await),
    ));
    let app = service!(node, false);

    let req = test::TestRequest::get().uri("/dataset/..x").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::post()
        .uri("/dataset")
        .set_json(json!({ "datasetId": "..x", "data": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
}

#[actix_web::test]
async fn malformed_body_is_rejected() {
    let network = MemoryNetwork::new();
    let app = service!(node(&network).await, false);

    let req = test::TestRequest::post()
        .uri("/dataset")
        .set_json(json!({ "data": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());
}

#[actix_web::test]
async fn p2p_connect_and_request() {
    let network = MemoryNetwork::new();
    let holder = node(&network).await;
    let reader = node(&network).await;
    let p = Principals::new();

    holder.registry().register_principal(&p.org, travlr_access::Role::Organization).await.unwrap();
    holder.put_dataset(&p.key, json!({"name": "Ada"})).await.unwrap();

    let app = service!(Arc::clone(&reader), false);
    let addr = holder.listen_addrs()[0].clone();

    let req = test::TestRequest::post()
        .uri("/p2p/connect")
        .set_json(json!({ "multiaddr": addr }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], format!("Connected to {}", addr));

    let req = test::TestRequest::get().uri("/p2p/multiaddrs").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["multiaddrs"][0], reader.listen_addrs()[0]);

    let req = test::TestRequest::post()
        .uri("/p2p/request-data")
        .set_json(json!({ "dataKey": p.key, "requesterDID": p.user }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Data request sent for personal_info");

    // The holder sees the request and, with no grant, stays silent.
    assert!(holder
        .exchange()
        .process_next(std::time::Duration::from_millis(200))
        .await
        .unwrap());
    assert_eq!(holder.exchange().stats().requests_dropped, 1);
}

#[actix_web::test]
async fn registry_routes_only_when_enabled() {
    let network = MemoryNetwork::new();
    let p = Principals::new();

    let app = service!(node(&network).await, false);
    let req = test::TestRequest::post()
        .uri("/register-node")
        .set_json(json!({ "did": p.org, "isOrganization": true }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let app = service!(node(&network).await, true);
    let req = test::TestRequest::post()
        .uri("/register-node")
        .set_json(json!({ "did": p.org, "isOrganization": true }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["transactionId"], "local_tx_1");

    let req = test::TestRequest::post()
        .uri("/grant-access")
        .set_json(json!({
            "granterDID": p.org,
            "granteeDID": p.user,
            "dataKey": p.key,
            "expirationTime": travlr_core::now_millis() + 86_400_000i64,
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["transactionId"], "local_tx_2");

    let uri = format!("/check-access?did={}&dataKey={}", p.user, p.key);
    let req = test::TestRequest::get().uri(&uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "hasAccess": true }));

    let req = test::TestRequest::post()
        .uri("/revoke-access")
        .set_json(json!({ "revokerDID": p.org, "granteeDID": p.user, "dataKey": p.key }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri(&uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "hasAccess": false }));
}
