//! Batch job persistence

use chrono::Utc;
use resale_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_timestamp;
use crate::models::{BatchJob, BatchScope, BatchStage, BatchStatus};
use crate::utils::retry_on_lock;

fn row_to_job(row: &SqliteRow) -> Result<BatchJob> {
    let job_id: String = row.try_get("job_id")?;
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|e| Error::Internal(format!("Invalid job id '{}': {}", job_id, e)))?;
    let stage = BatchStage::try_from(row.try_get::<i64, _>("stage")? as u8).map_err(Error::Internal)?;
    let scope: String = row.try_get("scope")?;
    let status: String = row.try_get("status")?;
    let started_at: String = row.try_get("started_at")?;
    let finished_at: Option<String> = row.try_get("finished_at")?;

    Ok(BatchJob {
        job_id,
        stage,
        scope: scope.parse::<BatchScope>().map_err(Error::Internal)?,
        status: status.parse::<BatchStatus>().map_err(Error::Internal)?,
        total: row.try_get::<i64, _>("total")? as usize,
        processed: row.try_get::<i64, _>("processed")? as usize,
        success_count: row.try_get::<i64, _>("success_count")? as usize,
        failed_count: row.try_get::<i64, _>("failed_count")? as usize,
        avg_confidence: row.try_get("avg_confidence")?,
        started_at: parse_timestamp("started_at", &started_at)?,
        finished_at: finished_at
            .map(|s| parse_timestamp("finished_at", &s))
            .transpose()?,
        last_error: row.try_get("last_error")?,
    })
}

/// Insert or update a job row with its current counters
pub async fn save_job(pool: &SqlitePool, job: &BatchJob, max_wait_ms: u64) -> Result<()> {
    let job_id = job.job_id.to_string();
    let started_at = job.started_at.to_rfc3339();
    let finished_at = job.finished_at.map(|dt| dt.to_rfc3339());

    retry_on_lock("save_batch_job", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO batch_jobs (
                job_id, stage, scope, status, total, processed, success_count,
                failed_count, avg_confidence, last_error, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                status = excluded.status,
                total = excluded.total,
                processed = excluded.processed,
                success_count = excluded.success_count,
                failed_count = excluded.failed_count,
                avg_confidence = excluded.avg_confidence,
                last_error = excluded.last_error,
                finished_at = excluded.finished_at
            "#,
        )
        .bind(&job_id)
        .bind(i64::from(job.stage.as_u8()))
        .bind(job.scope.as_str())
        .bind(job.status.as_str())
        .bind(job.total as i64)
        .bind(job.processed as i64)
        .bind(job.success_count as i64)
        .bind(job.failed_count as i64)
        .bind(job.avg_confidence)
        .bind(&job.last_error)
        .bind(&started_at)
        .bind(&finished_at)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    })
    .await
}

pub async fn load_job(pool: &SqlitePool, job_id: Uuid) -> Result<Option<BatchJob>> {
    let row = sqlx::query(
        r#"
        SELECT job_id, stage, scope, status, total, processed, success_count,
               failed_count, avg_confidence, last_error, started_at, finished_at
        FROM batch_jobs
        WHERE job_id = ?
        "#,
    )
    .bind(job_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_job).transpose()
}

/// True if a job of `stage` is idle or running
pub async fn has_active_job(pool: &SqlitePool, stage: BatchStage) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM batch_jobs WHERE stage = ? AND status IN ('idle', 'running')",
    )
    .bind(i64::from(stage.as_u8()))
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Cancel jobs left idle or running by a previous process
///
/// Their workers died with that process, so nothing will ever finish them.
pub async fn cleanup_stale_jobs(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE batch_jobs
        SET status = 'cancelled',
            finished_at = ?,
            last_error = COALESCE(last_error, 'interrupted by service restart')
        WHERE status IN ('idle', 'running')
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database_pool;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_roundtrip_with_progress() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database_pool(&temp_dir.path().join("resale.db")).await.unwrap();

        let mut job = BatchJob::new(BatchStage::ProfitRefinement, BatchScope::CategoryDetected, 3);
        save_job(&pool, &job, 1000).await.unwrap();

        job.status = BatchStatus::Running;
        job.record_success(90);
        job.record_failure("boom");
        save_job(&pool, &job, 1000).await.unwrap();

        let loaded = load_job(&pool, job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.stage, BatchStage::ProfitRefinement);
        assert_eq!(loaded.scope, BatchScope::CategoryDetected);
        assert_eq!(loaded.status, BatchStatus::Running);
        assert_eq!(loaded.processed, 2);
        assert_eq!(loaded.success_count, 1);
        assert_eq!(loaded.failed_count, 1);
        assert_eq!(loaded.last_error.as_deref(), Some("boom"));

        assert!(load_job(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_cancels_only_active_jobs() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database_pool(&temp_dir.path().join("resale.db")).await.unwrap();

        let mut running = BatchJob::new(BatchStage::CategoryDetection, BatchScope::All, 5);
        running.status = BatchStatus::Running;
        save_job(&pool, &running, 1000).await.unwrap();

        let mut done = BatchJob::new(BatchStage::CategoryDetection, BatchScope::All, 5);
        done.finish(BatchStatus::Completed);
        save_job(&pool, &done, 1000).await.unwrap();

        assert!(has_active_job(&pool, BatchStage::CategoryDetection).await.unwrap());
        assert!(!has_active_job(&pool, BatchStage::ProfitRefinement).await.unwrap());

        assert_eq!(cleanup_stale_jobs(&pool).await.unwrap(), 1);

        let cancelled = load_job(&pool, running.job_id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, BatchStatus::Cancelled);
        assert!(cancelled.finished_at.is_some());
        assert_eq!(
            load_job(&pool, done.job_id).await.unwrap().unwrap().status,
            BatchStatus::Completed
        );
        assert!(!has_active_job(&pool, BatchStage::CategoryDetection).await.unwrap());
    }
}
