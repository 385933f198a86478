//! Database access for resale-classifier
//!
//! Free functions over `&SqlitePool`; timestamps are stored as RFC 3339
//! text. Writes that can race with batch workers go through
//! `retry_on_lock`.

pub mod batch_jobs;
pub mod parameters;
pub mod patterns;
pub mod products;

use chrono::{DateTime, Utc};
use resale_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;

/// Open the shared database and create classifier tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = resale_common::db::init_database(db_path).await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create classifier tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS learned_patterns (
            signature TEXT PRIMARY KEY,
            category_id TEXT NOT NULL,
            category_name TEXT NOT NULL,
            confidence INTEGER NOT NULL CHECK (confidence BETWEEN 0 AND 100),
            usage_count INTEGER NOT NULL DEFAULT 1 CHECK (usage_count >= 1),
            human_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            product_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            brand TEXT,
            price_minor_units INTEGER NOT NULL,
            source_category TEXT,
            status TEXT NOT NULL DEFAULT 'unprocessed',
            category_id TEXT,
            category_name TEXT,
            confidence INTEGER,
            method TEXT,
            profit_margin REAL,
            profit_potential INTEGER,
            confidence_improvement INTEGER,
            stage1_confidence INTEGER,
            stage1_method TEXT,
            fee_total_minor_units INTEGER,
            has_fee_error INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_status ON products(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batch_jobs (
            job_id TEXT PRIMARY KEY,
            stage INTEGER NOT NULL,
            scope TEXT NOT NULL,
            status TEXT NOT NULL,
            total INTEGER NOT NULL DEFAULT 0,
            processed INTEGER NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            failed_count INTEGER NOT NULL DEFAULT 0,
            avg_confidence REAL NOT NULL DEFAULT 0.0,
            last_error TEXT,
            started_at TEXT NOT NULL,
            finished_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (learned_patterns, products, batch_jobs)");

    Ok(())
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

/// Clamp a stored confidence into the 0-100 domain
pub(crate) fn confidence_from_db(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
