//! Single-item classification and manual correction
//!
//! POST /classify/single, POST /classify/correct

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use resale_common::events::ResaleEvent;
use serde::Deserialize;

use crate::error::{ApiResult, ClassifyError};
use crate::models::{ClassificationResult, LearnedPattern, ProductDescriptor};
use crate::AppState;

/// POST /classify/single request
#[derive(Debug, Deserialize)]
pub struct ClassifySingleRequest {
    #[serde(flatten)]
    pub product: ProductDescriptor,
    /// Run Stage 2 refinement after category detection
    #[serde(default)]
    pub refine: bool,
}

/// POST /classify/correct request
#[derive(Debug, Deserialize)]
pub struct CorrectRequest {
    pub title: String,
    pub correct_category_id: String,
    #[serde(default)]
    pub correct_category_name: Option<String>,
}

/// POST /classify/single
///
/// Classify one product. Validation failures are 400, a fee or other
/// external lookup that stays unavailable is 502.
pub async fn classify_single(
    State(state): State<AppState>,
    Json(request): Json<ClassifySingleRequest>,
) -> ApiResult<Json<ClassificationResult>> {
    let engine = state.engine().await?;

    match engine.classify(&request.product, request.refine).await {
        Ok(result) => {
            tracing::debug!(
                category_id = ?result.category_id,
                confidence = result.confidence,
                method = %result.method,
                "Classified single product"
            );
            Ok(Json(result))
        }
        Err(e) => {
            if !matches!(e, ClassifyError::Validation(_)) {
                state.record_error(e.to_string()).await;
            }
            Err(e.into())
        }
    }
}

/// POST /classify/correct
///
/// Store a human-verified category for a title. Idempotent.
pub async fn correct_category(
    State(state): State<AppState>,
    Json(request): Json<CorrectRequest>,
) -> ApiResult<Json<LearnedPattern>> {
    let engine = state.engine().await?;
    let pattern = engine
        .correct(
            &request.title,
            &request.correct_category_id,
            request.correct_category_name.as_deref(),
        )
        .await?;

    state.event_bus.emit_lossy(ResaleEvent::PatternCorrected {
        signature: pattern.signature.clone(),
        category_id: pattern.category_id.clone(),
        timestamp: Utc::now(),
    });

    Ok(Json(pattern))
}

/// Build classification routes
pub fn classify_routes() -> Router<AppState> {
    Router::new()
        .route("/classify/single", post(classify_single))
        .route("/classify/correct", post(correct_category))
}
