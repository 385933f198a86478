//! Learned pattern persistence
//!
//! Both the lookup and the record path are single statements, so concurrent
//! workers classifying the same title can neither double-insert nor lose a
//! usage increment.

use chrono::Utc;
use resale_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{confidence_from_db, parse_timestamp};
use crate::models::{LearnedPattern, PatternStats};
use crate::utils::retry_on_lock;

const PATTERN_COLUMNS: &str = "signature, category_id, category_name, confidence, usage_count, \
                               human_verified, created_at, updated_at";

/// One write to the pattern table
#[derive(Debug, Clone)]
pub struct PatternWrite<'a> {
    pub signature: &'a str,
    pub category_id: &'a str,
    pub category_name: &'a str,
    pub confidence: u8,
    /// Manual corrections set this; they overwrite unconditionally and
    /// leave usage_count alone
    pub human_verified: bool,
}

fn row_to_pattern(row: &SqliteRow) -> Result<LearnedPattern> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(LearnedPattern {
        signature: row.try_get("signature")?,
        category_id: row.try_get("category_id")?,
        category_name: row.try_get("category_name")?,
        confidence: confidence_from_db(row.try_get("confidence")?),
        usage_count: row.try_get("usage_count")?,
        human_verified: row.try_get::<i64, _>("human_verified")? != 0,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

/// Fetch a pattern and count the hit in one statement
pub async fn lookup_and_touch(
    pool: &SqlitePool,
    signature: &str,
    max_wait_ms: u64,
) -> Result<Option<LearnedPattern>> {
    let sql = format!(
        "UPDATE learned_patterns SET usage_count = usage_count + 1, updated_at = ? \
         WHERE signature = ? RETURNING {}",
        PATTERN_COLUMNS
    );

    retry_on_lock("lookup_pattern", max_wait_ms, || async {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(&sql)
            .bind(&now)
            .bind(signature)
            .fetch_optional(pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(row_to_pattern).transpose()
    })
    .await
}

/// Insert or update a pattern, returning the row as stored
///
/// - new signature: inserted with usage_count 1
/// - automatic write over an automatic row: overwrites, usage_count + 1
/// - automatic write over a verified row: no change
/// - manual write: overwrites and marks verified, usage_count unchanged
pub async fn upsert_pattern(
    pool: &SqlitePool,
    write: &PatternWrite<'_>,
    max_wait_ms: u64,
) -> Result<LearnedPattern> {
    let sql = format!(
        r#"
        INSERT INTO learned_patterns (
            signature, category_id, category_name, confidence,
            usage_count, human_verified, created_at, updated_at
        ) VALUES (?, ?, ?, ?, 1, ?, ?, ?)
        ON CONFLICT(signature) DO UPDATE SET
            category_id = excluded.category_id,
            category_name = excluded.category_name,
            confidence = excluded.confidence,
            usage_count = learned_patterns.usage_count
                + CASE WHEN excluded.human_verified = 1 THEN 0 ELSE 1 END,
            human_verified = excluded.human_verified,
            updated_at = excluded.updated_at
        WHERE learned_patterns.human_verified = 0 OR excluded.human_verified = 1
        RETURNING {}
        "#,
        PATTERN_COLUMNS
    );

    let stored = retry_on_lock("record_pattern", max_wait_ms, || async {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(&sql)
            .bind(write.signature)
            .bind(write.category_id)
            .bind(write.category_name)
            .bind(i64::from(write.confidence))
            .bind(write.human_verified)
            .bind(&now)
            .bind(&now)
            .fetch_optional(pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(row_to_pattern).transpose()
    })
    .await?;

    match stored {
        Some(pattern) => Ok(pattern),
        // Conflict update was suppressed: the existing row is verified
        None => get_pattern(pool, write.signature).await?.ok_or_else(|| {
            Error::Internal(format!(
                "pattern {} vanished during upsert",
                write.signature
            ))
        }),
    }
}

/// Read a pattern without counting a hit
pub async fn get_pattern(pool: &SqlitePool, signature: &str) -> Result<Option<LearnedPattern>> {
    let sql = format!(
        "SELECT {} FROM learned_patterns WHERE signature = ?",
        PATTERN_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(signature)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_pattern).transpose()
}

pub async fn pattern_stats(pool: &SqlitePool, maturity_threshold: i64) -> Result<PatternStats> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total_patterns,
            COALESCE(SUM(CASE WHEN usage_count > ? THEN 1 ELSE 0 END), 0) AS mature_patterns,
            COALESCE(SUM(human_verified), 0) AS human_verified_patterns,
            COALESCE(SUM(usage_count), 0) AS total_usage
        FROM learned_patterns
        "#,
    )
    .bind(maturity_threshold)
    .fetch_one(pool)
    .await?;

    Ok(PatternStats {
        total_patterns: row.try_get("total_patterns")?,
        mature_patterns: row.try_get("mature_patterns")?,
        human_verified_patterns: row.try_get("human_verified_patterns")?,
        total_usage: row.try_get("total_usage")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database_pool;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqlitePool) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database_pool(&temp_dir.path().join("resale.db"))
            .await
            .unwrap();
        (temp_dir, pool)
    }

    fn auto<'a>(signature: &'a str, category_id: &'a str, confidence: u8) -> PatternWrite<'a> {
        PatternWrite {
            signature,
            category_id,
            category_name: "Test Category",
            confidence,
            human_verified: false,
        }
    }

    #[tokio::test]
    async fn test_insert_then_lookup_increments_usage() {
        let (_dir, pool) = setup().await;

        let inserted = upsert_pattern(&pool, &auto("sig", "31388", 80), 1000).await.unwrap();
        assert_eq!(inserted.usage_count, 1);
        assert!(!inserted.human_verified);

        let hit = lookup_and_touch(&pool, "sig", 1000).await.unwrap().unwrap();
        assert_eq!(hit.usage_count, 2);
        assert_eq!(hit.category_id, "31388");

        assert!(lookup_and_touch(&pool, "other", 1000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_automatic_write_cannot_override_verified() {
        let (_dir, pool) = setup().await;

        let manual = PatternWrite {
            signature: "sig",
            category_id: "293",
            category_name: "Consumer Electronics",
            confidence: 100,
            human_verified: true,
        };
        upsert_pattern(&pool, &manual, 1000).await.unwrap();

        let after = upsert_pattern(&pool, &auto("sig", "31388", 90), 1000).await.unwrap();
        assert_eq!(after.category_id, "293");
        assert!(after.human_verified);
        assert_eq!(after.usage_count, 1);
    }

    #[tokio::test]
    async fn test_manual_write_overrides_and_keeps_usage() {
        let (_dir, pool) = setup().await;

        upsert_pattern(&pool, &auto("sig", "31388", 70), 1000).await.unwrap();
        lookup_and_touch(&pool, "sig", 1000).await.unwrap();

        let manual = PatternWrite {
            signature: "sig",
            category_id: "3323",
            category_name: "Lenses",
            confidence: 100,
            human_verified: true,
        };
        let corrected = upsert_pattern(&pool, &manual, 1000).await.unwrap();
        assert_eq!(corrected.category_id, "3323");
        assert_eq!(corrected.usage_count, 2);

        // Idempotent
        let again = upsert_pattern(&pool, &manual, 1000).await.unwrap();
        assert_eq!(again.category_id, "3323");
        assert_eq!(again.usage_count, 2);
    }

    #[tokio::test]
    async fn test_stats() {
        let (_dir, pool) = setup().await;
        upsert_pattern(&pool, &auto("a", "1", 50), 1000).await.unwrap();
        upsert_pattern(&pool, &auto("b", "1", 50), 1000).await.unwrap();
        for _ in 0..3 {
            lookup_and_touch(&pool, "a", 1000).await.unwrap();
        }

        let stats = pattern_stats(&pool, 2).await.unwrap();
        assert_eq!(stats.total_patterns, 2);
        assert_eq!(stats.mature_patterns, 1);
        assert_eq!(stats.human_verified_patterns, 0);
        assert_eq!(stats.total_usage, 5);
    }
}
