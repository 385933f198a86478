//! Learned pattern statistics
//!
//! GET /patterns/stats

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::models::PatternStats;
use crate::AppState;

/// GET /patterns/stats response
#[derive(Debug, Serialize, Deserialize)]
pub struct PatternStatsResponse {
    #[serde(flatten)]
    pub stats: PatternStats,
    /// Usage count a pattern must exceed to count as mature
    pub maturity_threshold: i64,
}

/// GET /patterns/stats
pub async fn get_pattern_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<PatternStatsResponse>> {
    let engine = state.engine().await?;
    let stats = engine.pattern_stats().await?;

    Ok(Json(PatternStatsResponse {
        stats,
        maturity_threshold: engine.params().maturity_threshold,
    }))
}

/// Build pattern routes
pub fn pattern_routes() -> Router<AppState> {
    Router::new().route("/patterns/stats", get(get_pattern_stats))
}
