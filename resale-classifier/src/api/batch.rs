//! Batch classification API handlers
//!
//! POST /classify/batch, GET /classify/batch/progress,
//! POST /classify/batch/pause, GET /classify/batch/events

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{BatchJob, BatchScope, BatchStage};
use crate::services::{BatchError, BatchRequest};
use crate::AppState;

fn default_scope() -> BatchScope {
    BatchScope::Unprocessed
}

fn default_batch_size() -> usize {
    50
}

/// POST /classify/batch request
#[derive(Debug, Deserialize)]
pub struct StartBatchRequest {
    pub stage: BatchStage,
    #[serde(default = "default_scope")]
    pub scope: BatchScope,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// POST /classify/batch response
#[derive(Debug, Serialize, Deserialize)]
pub struct StartBatchResponse {
    pub job_id: Uuid,
    pub target_count: usize,
}

/// GET /classify/batch/progress query
#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub job_id: Uuid,
}

/// POST /classify/batch/pause request
#[derive(Debug, Deserialize)]
pub struct PauseRequest {
    pub job_id: Uuid,
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Conflict(msg) => ApiError::Conflict(msg),
            BatchError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            BatchError::NotFound(job_id) => {
                ApiError::NotFound(format!("Batch job not found: {}", job_id))
            }
            BatchError::Persistence(e) => ApiError::Common(e),
        }
    }
}

/// POST /classify/batch
///
/// Start a batch job. 409 if a job for the same stage is already active.
pub async fn start_batch(
    State(state): State<AppState>,
    Json(request): Json<StartBatchRequest>,
) -> ApiResult<Json<StartBatchResponse>> {
    let (job_id, target_count) = state
        .orchestrator
        .start(BatchRequest {
            stage: request.stage,
            scope: request.scope,
            batch_size: request.batch_size,
            limit: request.limit,
        })
        .await?;

    Ok(Json(StartBatchResponse {
        job_id,
        target_count,
    }))
}

/// GET /classify/batch/progress?job_id=
pub async fn get_batch_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<BatchJob>> {
    Ok(Json(state.orchestrator.get_progress(query.job_id).await?))
}

/// POST /classify/batch/pause
///
/// Cancels the job cooperatively; resume by starting a new job over the
/// `unprocessed` scope.
pub async fn pause_batch(
    State(state): State<AppState>,
    Json(request): Json<PauseRequest>,
) -> ApiResult<Json<BatchJob>> {
    Ok(Json(state.orchestrator.pause(request.job_id).await?))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/classify/batch", post(start_batch))
        .route("/classify/batch/progress", get(get_batch_progress))
        .route("/classify/batch/pause", post(pause_batch))
        .route("/classify/batch/events", get(super::sse::batch_event_stream))
}
