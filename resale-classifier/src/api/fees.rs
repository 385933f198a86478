//! Fee resolution
//!
//! POST /fee/resolve

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult, ClassifyError};
use crate::models::FeeQuote;
use crate::AppState;

/// POST /fee/resolve request
#[derive(Debug, Deserialize)]
pub struct ResolveFeeRequest {
    pub category_id: String,
    #[serde(alias = "price_minor_units")]
    pub price: i64,
}

/// POST /fee/resolve
///
/// A category without a fee row is not an error: the quote comes back with
/// `has_fee_error: true` and no amounts.
pub async fn resolve_fee(
    State(state): State<AppState>,
    Json(request): Json<ResolveFeeRequest>,
) -> ApiResult<Json<FeeQuote>> {
    let category_id = request.category_id.trim();
    if category_id.is_empty() {
        return Err(ApiError::BadRequest("category_id is required".to_string()));
    }
    if request.price < 0 {
        return Err(ApiError::BadRequest(format!(
            "price must not be negative (got {})",
            request.price
        )));
    }

    match state.fee_resolver.resolve(category_id, request.price).await {
        Ok(quote) => Ok(Json(quote)),
        Err(e) => {
            if matches!(e, ClassifyError::ExternalLookup { .. }) {
                state.record_error(e.to_string()).await;
            }
            Err(e.into())
        }
    }
}

/// Build fee routes
pub fn fee_routes() -> Router<AppState> {
    Router::new().route("/fee/resolve", post(resolve_fee))
}
