//! Remote fee service integration
//!
//! A local axum server stands in for the fee service.

mod helpers;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use helpers::{create_test_state_with, get_json, send_json, wait_for_terminal};
use resale_classifier::models::{BatchScope, BatchStage, BatchStatus, ProductDescriptor};
use resale_classifier::services::{BatchRequest, RemoteFeeClient};
use serde_json::json;

async fn fee_row(Path(category_id): Path<String>) -> Response {
    match category_id.as_str() {
        "31388" => Json(json!({
            "category_id": "31388",
            "final_value_fee_percent": 10.0,
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn spawn_fee_service(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_remote_row_takes_precedence() {
    let url = spawn_fee_service(Router::new().route("/fees/:id", get(fee_row))).await;
    let (_dir, state) = create_test_state_with(|resolver| {
        resolver.with_remote(RemoteFeeClient::new(url).unwrap())
    })
    .await;
    assert!(state.fee_resolver.has_remote());
    let app = resale_classifier::build_router(state);

    let (status, quote) = send_json(
        &app,
        "POST",
        "/fee/resolve",
        json!({ "category_id": "31388", "price": 100000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["final_value_fee_percent"], 10.0);
    assert_eq!(quote["final_value_fee_amount"], 10000);
    assert_eq!(quote["total_fee_amount"], 13040);

    // Service has no row: local schedule answers
    let (status, quote) = send_json(
        &app,
        "POST",
        "/fee/resolve",
        json!({ "category_id": "31387", "price": 100000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["final_value_fee_percent"], 15.0);

    let (status, quote) = send_json(
        &app,
        "POST",
        "/fee/resolve",
        json!({ "category_id": "293", "price": 100000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["has_fee_error"], true);
}

#[tokio::test]
async fn test_unavailable_service_is_bad_gateway() {
    let url = spawn_fee_service(Router::new().route("/fees/:id", get(unavailable))).await;
    let (_dir, state) = create_test_state_with(|resolver| {
        resolver.with_remote(RemoteFeeClient::new(url).unwrap())
    })
    .await;
    let app = resale_classifier::build_router(state);

    let (status, json) = send_json(
        &app,
        "POST",
        "/fee/resolve",
        json!({ "category_id": "31388", "price": 100000 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "EXTERNAL_LOOKUP_FAILED");

    let (_, health) = get_json(&app, "/health").await;
    assert!(health["last_error"]
        .as_str()
        .unwrap()
        .contains("fee_service"));
}

#[tokio::test]
async fn test_unavailable_service_fails_items_not_batch() {
    let url = spawn_fee_service(Router::new().route("/fees/:id", get(unavailable))).await;
    let (_dir, state) = create_test_state_with(|resolver| {
        resolver.with_remote(RemoteFeeClient::new(url).unwrap())
    })
    .await;

    resale_classifier::db::products::upsert_product(
        &state.db,
        "cam",
        &ProductDescriptor::new("Canon EOS R6 ボディ", 250000),
    )
    .await
    .unwrap();
    resale_classifier::db::products::upsert_product(
        &state.db,
        "unknown",
        &ProductDescriptor::new("qwzx plmk", 1000),
    )
    .await
    .unwrap();

    let (job_id, target_count) = state
        .orchestrator
        .start(BatchRequest {
            stage: BatchStage::CategoryDetection,
            scope: BatchScope::All,
            batch_size: 10,
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(target_count, 2);

    let job = wait_for_terminal(&state, job_id).await;
    assert_eq!(job.status, BatchStatus::Completed);
    assert_eq!(job.processed, 2);
    // The camera needs a fee quote and fails; the uncategorized title does not
    assert_eq!(job.failed_count, 1);
    assert_eq!(job.success_count, 0);
    assert!(job.last_error.unwrap().contains("fee_service"));
}
