//! resale-classifier library interface
//!
//! Category classification and confidence learning for the resale
//! back-office. Exposes the router and services for integration testing.

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, ClassifyError};

use axum::Router;
use chrono::{DateTime, Utc};
use resale_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::catalog::CatalogSet;
use crate::services::{BatchOrchestrator, ClassificationEngine, FeeResolver};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Keyword rules, bootstrap patterns and fee schedule
    pub catalog: Arc<CatalogSet>,
    pub fee_resolver: FeeResolver,
    /// Batch jobs and their cancellation tokens
    pub orchestrator: Arc<BatchOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        catalog: Arc<CatalogSet>,
        fee_resolver: FeeResolver,
    ) -> Self {
        let orchestrator = Arc::new(BatchOrchestrator::new(
            db.clone(),
            event_bus.clone(),
            catalog.clone(),
            fee_resolver.clone(),
        ));
        Self {
            db,
            event_bus,
            catalog,
            fee_resolver,
            orchestrator,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Engine bound to the currently stored classifier parameters
    pub async fn engine(&self) -> resale_common::Result<ClassificationEngine> {
        let params = db::parameters::load_classifier_parameters(&self.db).await?;
        Ok(ClassificationEngine::new(
            self.db.clone(),
            self.catalog.clone(),
            params,
        ))
    }

    /// Remember a server-side failure for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::classify_routes())
        .merge(api::batch_routes())
        .merge(api::fee_routes())
        .merge(api::product_routes())
        .merge(api::pattern_routes())
        .merge(api::parameter_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
