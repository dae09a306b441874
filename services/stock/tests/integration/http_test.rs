use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{Value, json};

use nexus_stock::domain::ledger::KeyLedger;
use nexus_stock::domain::types::KeyStatus;
use nexus_stock::infra::memory::MemoryStockStore;
use nexus_stock::router::build_router;
use nexus_stock::state::AppState;

use crate::helpers::{OVERRIDE, key_status, seed_key, seed_product};

fn server(store: &MemoryStockStore) -> TestServer {
    let state = AppState {
        store: store.clone(),
        ledger: KeyLedger::new(Some(OVERRIDE.to_owned())),
        consume_timeout: Duration::from_secs(5),
    };
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn should_answer_health_checks() {
    let server = server(&MemoryStockStore::default());
    server.get("/healthz").await.assert_status_ok();
    server.get("/readyz").await.assert_status_ok();
}

#[tokio::test]
async fn should_list_products_with_available_counts() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["a", "b"]).await;

    let response = server(&store).get("/products").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body[0]["id"], product.to_string());
    assert_eq!(body[0]["available_count"], 2);
    assert_eq!(body[0]["icon"], "🎬");
}

#[tokio::test]
async fn should_consume_and_then_reject_reused_key() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["user:pass", "other"]).await;
    seed_key(&store, "NEXUS-HTTP01").await;
    let server = server(&store);
    let path = format!("/products/{product}/consume");

    let first = server
        .post(&path)
        .json(&json!({ "key": "NEXUS-HTTP01" }))
        .await;
    first.assert_status_ok();
    let body: Value = first.json();
    assert_eq!(body["content"], "user:pass");
    assert!(body["consumed_at"].as_str().unwrap().ends_with('Z'));

    let second = server
        .post(&path)
        .json(&json!({ "key": "NEXUS-HTTP01" }))
        .await;
    second.assert_status(StatusCode::CONFLICT);
    let body: Value = second.json();
    assert_eq!(body["kind"], "KEY_ALREADY_USED");
    assert_eq!(key_status(&store, "NEXUS-HTTP01").await, KeyStatus::Used);
}

#[tokio::test]
async fn should_map_key_and_stock_failures_to_status_codes() {
    let store = MemoryStockStore::default();
    let empty = seed_product(&store, &[]).await;
    seed_key(&store, "NEXUS-HTTP02").await;
    let server = server(&store);

    let unknown = server
        .post(&format!("/products/{empty}/consume"))
        .json(&json!({ "key": "NEXUS-NOPE00" }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.json::<Value>()["kind"], "KEY_INVALID");

    let out = server
        .post(&format!("/products/{empty}/consume"))
        .json(&json!({ "key": "NEXUS-HTTP02" }))
        .await;
    out.assert_status(StatusCode::CONFLICT);
    assert_eq!(out.json::<Value>()["kind"], "OUT_OF_STOCK");
    assert_eq!(key_status(&store, "NEXUS-HTTP02").await, KeyStatus::Unused);
}

#[tokio::test]
async fn should_validate_key_for_login() {
    let store = MemoryStockStore::default();
    seed_key(&store, "NEXUS-HTTP03").await;
    let server = server(&store);

    let known = server
        .post("/keys/validate")
        .json(&json!({ "code": "NEXUS-HTTP03" }))
        .await;
    known.assert_status_ok();
    let body: Value = known.json();
    assert_eq!(body["valid"], true);
    assert_eq!(body["already_used"], false);
    assert_eq!(body["is_override"], false);
    assert!(body["expires_at"].is_string());

    let unknown = server
        .post("/keys/validate")
        .json(&json!({ "code": "NEXUS-NOPE00" }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_run_admin_flow_end_to_end() {
    let store = MemoryStockStore::default();
    let server = server(&store);

    let created = server
        .post("/admin/products")
        .json(&json!({ "name": "YouTube Premium" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let product: Value = created.json();
    assert_eq!(product["icon"], "✨");
    let product_id = product["id"].as_str().unwrap().to_owned();

    let stocked = server
        .post(&format!("/admin/products/{product_id}/stock"))
        .json(&json!({ "lines": "yt1:pw\nyt2:pw\n" }))
        .await;
    stocked.assert_status(StatusCode::CREATED);
    assert_eq!(stocked.json::<Value>()["added"], 2);

    let issued = server
        .post("/admin/keys")
        .json(&json!({ "count": 2, "ttl_hours": 24 }))
        .await;
    issued.assert_status(StatusCode::CREATED);
    let keys: Value = issued.json();
    let code = keys[0]["code"].as_str().unwrap().to_owned();
    assert!(code.starts_with("NEXUS-"));
    assert_eq!(keys[0]["status"], "unused");

    server
        .post(&format!("/products/{product_id}/consume"))
        .json(&json!({ "key": code }))
        .await
        .assert_status_ok();

    let audit = server
        .get("/admin/audit")
        .add_query_param("product_id", &product_id)
        .await;
    audit.assert_status_ok();
    let entries: Value = audit.json();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["content"], "yt1:pw");
    assert_eq!(entries[0]["key_used"], code);

    let listed = server.get("/admin/keys").add_query_param("per-page", 10).await;
    listed.assert_status_ok();
    assert_eq!(listed.json::<Value>().as_array().unwrap().len(), 2);

    let cleared = server
        .delete(&format!("/admin/products/{product_id}/stock"))
        .await;
    cleared.assert_status_ok();
    assert_eq!(cleared.json::<Value>()["removed"], 1);

    server
        .delete(&format!("/admin/products/{product_id}"))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete(&format!("/admin/products/{product_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_reject_invalid_admin_input() {
    let server = server(&MemoryStockStore::default());

    let zero = server.post("/admin/keys").json(&json!({ "count": 0 })).await;
    zero.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(zero.json::<Value>()["kind"], "INVALID_INPUT");

    server
        .post("/admin/products")
        .json(&json!({ "name": "  " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let missing = uuid::Uuid::now_v7();
    server
        .delete(&format!("/admin/keys/{missing}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_echo_request_id() {
    let server = server(&MemoryStockStore::default());

    let response = server
        .get("/healthz")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .await;

    assert_eq!(response.header("x-request-id"), "req-123");
}
