//! Shared fixtures for resale-classifier integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use resale_classifier::catalog::CatalogSet;
use resale_classifier::models::{ClassifierParameters, PaymentFeeSettings};
use resale_classifier::services::FeeResolver;
use resale_classifier::AppState;
use resale_common::events::EventBus;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Test state over a fresh database in a temp dir
///
/// The TempDir must outlive the state.
pub async fn create_test_state() -> (TempDir, AppState) {
    create_test_state_with(|resolver| resolver).await
}

/// Like [`create_test_state`], with a hook to adjust the fee resolver
pub async fn create_test_state_with(
    configure_fees: impl FnOnce(FeeResolver) -> FeeResolver,
) -> (TempDir, AppState) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = resale_classifier::db::init_database_pool(&temp_dir.path().join("resale.db"))
        .await
        .expect("Failed to initialize database");

    // No pacing between batch items in tests
    let params = ClassifierParameters {
        inter_item_delay_ms: 0,
        ..Default::default()
    };
    resale_classifier::db::parameters::save_classifier_parameters(&pool, &params)
        .await
        .expect("Failed to save parameters");

    let catalog = Arc::new(CatalogSet::embedded_default().expect("Embedded catalog is valid"));
    let fee_resolver =
        configure_fees(FeeResolver::new(catalog.clone(), PaymentFeeSettings::default()));

    let state = AppState::new(pool, EventBus::new(100), catalog, fee_resolver);
    (temp_dir, state)
}

pub async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Poll a job until it reaches a terminal status
pub async fn wait_for_terminal(state: &AppState, job_id: uuid::Uuid) -> resale_classifier::models::BatchJob {
    for _ in 0..200 {
        let job = state.orchestrator.get_progress(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("batch job {} did not finish in time", job_id);
}
