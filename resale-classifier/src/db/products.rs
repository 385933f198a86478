//! Product persistence and batch queue selection

use chrono::Utc;
use resale_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

use super::{confidence_from_db, parse_timestamp};
use crate::models::{
    BatchScope, BatchStage, ClassificationMethod, ClassificationResult, FeeQuote,
    ProductDescriptor, ProductRecord, ProductStatus,
};
use crate::utils::retry_on_lock;

const PRODUCT_COLUMNS: &str = "product_id, title, brand, price_minor_units, source_category, \
    status, category_id, category_name, confidence, method, profit_margin, profit_potential, \
    confidence_improvement, stage1_confidence, stage1_method, fee_total_minor_units, has_fee_error, last_error, created_at, updated_at";

fn row_to_product(row: &SqliteRow) -> Result<ProductRecord> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<ProductStatus>().map_err(Error::Internal)?;
    let method: Option<String> = row.try_get("method")?;
    let method = method
        .map(|m| m.parse::<ClassificationMethod>().map_err(Error::Internal))
        .transpose()?;
    let stage1_method: Option<String> = row.try_get("stage1_method")?;
    let stage1_method = stage1_method
        .map(|m| m.parse::<ClassificationMethod>().map_err(Error::Internal))
        .transpose()?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(ProductRecord {
        product_id: row.try_get("product_id")?,
        title: row.try_get("title")?,
        brand: row.try_get("brand")?,
        price_minor_units: row.try_get("price_minor_units")?,
        source_category: row.try_get("source_category")?,
        status,
        category_id: row.try_get("category_id")?,
        category_name: row.try_get("category_name")?,
        confidence: row
            .try_get::<Option<i64>, _>("confidence")?
            .map(confidence_from_db),
        method,
        profit_margin: row.try_get("profit_margin")?,
        profit_potential: row.try_get("profit_potential")?,
        confidence_improvement: row
            .try_get::<Option<i64>, _>("confidence_improvement")?
            .map(|v| v as i32),
        stage1_confidence: row
            .try_get::<Option<i64>, _>("stage1_confidence")?
            .map(confidence_from_db),
        stage1_method,
        fee_total_minor_units: row.try_get("fee_total_minor_units")?,
        has_fee_error: row.try_get::<i64, _>("has_fee_error")? != 0,
        last_error: row.try_get("last_error")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

/// Register (or re-register) a scraped product
///
/// Re-registering replaces the descriptor and clears any previous
/// classification so the product re-enters the queue.
pub async fn upsert_product(
    pool: &SqlitePool,
    product_id: &str,
    product: &ProductDescriptor,
) -> Result<ProductRecord> {
    let now = Utc::now().to_rfc3339();
    let sql = format!(
        r#"
        INSERT INTO products (
            product_id, title, brand, price_minor_units, source_category,
            status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, 'unprocessed', ?, ?)
        ON CONFLICT(product_id) DO UPDATE SET
            title = excluded.title,
            brand = excluded.brand,
            price_minor_units = excluded.price_minor_units,
            source_category = excluded.source_category,
            status = 'unprocessed',
            category_id = NULL,
            category_name = NULL,
            confidence = NULL,
            method = NULL,
            profit_margin = NULL,
            profit_potential = NULL,
            confidence_improvement = NULL,
            stage1_confidence = NULL,
            stage1_method = NULL,
            fee_total_minor_units = NULL,
            has_fee_error = 0,
            last_error = NULL,
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        PRODUCT_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(product_id)
        .bind(&product.title)
        .bind(&product.brand)
        .bind(product.price_minor_units)
        .bind(&product.source_category)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await?;

    row_to_product(&row)
}

pub async fn get_product(pool: &SqlitePool, product_id: &str) -> Result<Option<ProductRecord>> {
    let sql = format!("SELECT {} FROM products WHERE product_id = ?", PRODUCT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_product).transpose()
}

/// Snapshot the ids a batch job will process, oldest first
pub async fn select_queue(
    pool: &SqlitePool,
    stage: BatchStage,
    scope: BatchScope,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let filter = match (stage, scope) {
        (_, BatchScope::All) => "1 = 1",
        (BatchStage::CategoryDetection, BatchScope::Unprocessed) => "category_id IS NULL",
        (BatchStage::ProfitRefinement, BatchScope::Unprocessed) => "status != 'profit_refined'",
        (_, BatchScope::CategoryDetected) => "status = 'category_detected'",
    };
    let limit = limit
        .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
        .unwrap_or(-1);

    let sql = format!(
        "SELECT product_id FROM products WHERE {} ORDER BY created_at, product_id LIMIT ?",
        filter
    );
    let ids: Vec<String> = sqlx::query_scalar(&sql).bind(limit).fetch_all(pool).await?;
    Ok(ids)
}

/// Load products by id, preserving the order of `ids`
///
/// Ids that no longer exist are skipped.
pub async fn load_products(pool: &SqlitePool, ids: &[String]) -> Result<Vec<ProductRecord>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM products WHERE product_id IN (", PRODUCT_COLUMNS));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");

    let rows = builder.build().fetch_all(pool).await?;
    let mut by_id: HashMap<String, ProductRecord> = HashMap::with_capacity(rows.len());
    for row in &rows {
        let product = row_to_product(row)?;
        by_id.insert(product.product_id.clone(), product);
    }

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Store a classification outcome and its fee quote on the product
///
/// `baseline` is the Stage 1 result `result` was derived from (the same
/// value for a Stage 1 write). It is kept apart so later refinement runs
/// start from it rather than from an already refined result.
pub async fn record_classification(
    pool: &SqlitePool,
    product_id: &str,
    status: ProductStatus,
    baseline: &ClassificationResult,
    result: &ClassificationResult,
    fee: Option<&FeeQuote>,
    max_wait_ms: u64,
) -> Result<()> {
    let method = result.method.as_str();
    let baseline_method = baseline.method.as_str();
    let fee_total = fee.and_then(|f| f.total_fee_amount);
    let has_fee_error = fee.is_some_and(|f| f.has_fee_error);

    retry_on_lock("record_classification", max_wait_ms, || async {
        sqlx::query(
            r#"
            UPDATE products SET
                status = ?,
                category_id = ?,
                category_name = ?,
                confidence = ?,
                method = ?,
                profit_margin = ?,
                profit_potential = ?,
                confidence_improvement = ?,
                stage1_confidence = ?,
                stage1_method = ?,
                fee_total_minor_units = ?,
                has_fee_error = ?,
                last_error = NULL,
                updated_at = ?
            WHERE product_id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(&result.category_id)
        .bind(&result.category_name)
        .bind(i64::from(result.confidence))
        .bind(method)
        .bind(result.profit_margin)
        .bind(result.profit_potential)
        .bind(result.confidence_improvement.map(i64::from))
        .bind(i64::from(baseline.confidence))
        .bind(baseline_method)
        .bind(fee_total)
        .bind(has_fee_error)
        .bind(Utc::now().to_rfc3339())
        .bind(product_id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    })
    .await
}

/// Mark a product failed, keeping any earlier classification
pub async fn record_failure(
    pool: &SqlitePool,
    product_id: &str,
    error: &str,
    max_wait_ms: u64,
) -> Result<()> {
    retry_on_lock("record_product_failure", max_wait_ms, || async {
        sqlx::query(
            "UPDATE products SET status = 'failed', last_error = ?, updated_at = ? WHERE product_id = ?",
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(product_id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    })
    .await
}
