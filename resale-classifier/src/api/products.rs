//! Product registration for the batch queue
//!
//! POST /products, GET /products/:id

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{ProductDescriptor, ProductRecord};
use crate::AppState;

/// POST /products request
#[derive(Debug, Deserialize)]
pub struct RegisterProductRequest {
    /// Caller-supplied identifier; a UUID is generated when absent
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(flatten)]
    pub product: ProductDescriptor,
}

/// POST /products
///
/// Registers a scraped product as `unprocessed`. Re-registering an id
/// replaces its descriptor and clears any earlier classification.
pub async fn register_product(
    State(state): State<AppState>,
    Json(request): Json<RegisterProductRequest>,
) -> ApiResult<Json<ProductRecord>> {
    request.product.validate()?;

    let product_id = match request.product_id.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::BadRequest("product_id must not be empty".to_string())),
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    };

    let record =
        crate::db::products::upsert_product(&state.db, &product_id, &request.product).await?;

    tracing::debug!(product_id = %record.product_id, "Registered product");

    Ok(Json(record))
}

/// GET /products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<ProductRecord>> {
    crate::db::products::get_product(&state.db, &product_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Product not found: {}", product_id)))
}

/// Build product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(register_product))
        .route("/products/:id", get(get_product))
}
