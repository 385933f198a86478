//! Classifier parameter API handlers
//!
//! GET /parameters/classifier, POST /parameters/classifier

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::{ClassifierParameters, ClassifierParametersUpdate};
use crate::AppState;

/// GET /parameters/classifier response
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifierParametersResponse {
    #[serde(flatten)]
    pub parameters: ClassifierParameters,
}

/// POST /parameters/classifier response
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateParametersResponse {
    pub status: String,
    pub parameters: ClassifierParameters,
}

/// GET /parameters/classifier
pub async fn get_classifier_parameters(
    State(state): State<AppState>,
) -> ApiResult<Json<ClassifierParametersResponse>> {
    let parameters = crate::db::parameters::load_classifier_parameters(&state.db).await?;

    tracing::debug!(?parameters, "Get classifier parameters from database");

    Ok(Json(ClassifierParametersResponse { parameters }))
}

/// POST /parameters/classifier
///
/// Partial update. The merged set is validated as a whole before anything
/// is written; running batch jobs keep the snapshot they started with.
pub async fn update_classifier_parameters(
    State(state): State<AppState>,
    Json(request): Json<ClassifierParametersUpdate>,
) -> ApiResult<Json<UpdateParametersResponse>> {
    tracing::info!(?request, "Update classifier parameters");

    let current = crate::db::parameters::load_classifier_parameters(&state.db).await?;
    let parameters = current.merged(&request);
    parameters.validate().map_err(ApiError::BadRequest)?;

    crate::db::parameters::save_classifier_parameters(&state.db, &parameters).await?;

    Ok(Json(UpdateParametersResponse {
        status: "updated".to_string(),
        parameters,
    }))
}

/// Build parameter management routes
pub fn parameter_routes() -> Router<AppState> {
    Router::new()
        .route("/parameters/classifier", get(get_classifier_parameters))
        .route("/parameters/classifier", post(update_classifier_parameters))
}
