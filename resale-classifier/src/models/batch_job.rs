//! Batch classification jobs
//!
//! Lifecycle: Idle → Running → {Completed | Failed | Cancelled}. Pausing a
//! job cancels it; resuming means starting a new job over the `unprocessed`
//! scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Batch job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Created, worker not yet running
    Idle,
    Running,
    Completed,
    /// Queue could not be loaded or the worker hit an unrecoverable error
    Failed,
    /// Paused by the operator or abandoned by a previous process
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Idle => "idle",
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(BatchStatus::Idle),
            "running" => Ok(BatchStatus::Running),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            "cancelled" => Ok(BatchStatus::Cancelled),
            other => Err(format!("unknown batch status: {}", other)),
        }
    }
}

/// Pipeline stage a batch job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BatchStage {
    /// Category detection (pattern cache + keyword heuristics)
    CategoryDetection,
    /// Profit-aware refinement on top of category detection
    ProfitRefinement,
}

impl BatchStage {
    pub fn as_u8(&self) -> u8 {
        match self {
            BatchStage::CategoryDetection => 1,
            BatchStage::ProfitRefinement => 2,
        }
    }
}

impl TryFrom<u8> for BatchStage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(BatchStage::CategoryDetection),
            2 => Ok(BatchStage::ProfitRefinement),
            other => Err(format!("stage must be 1 or 2 (got {})", other)),
        }
    }
}

impl From<BatchStage> for u8 {
    fn from(stage: BatchStage) -> Self {
        stage.as_u8()
    }
}

/// Which products a job draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchScope {
    All,
    /// Stage 1: no category yet. Stage 2: not yet profit-refined.
    Unprocessed,
    /// Products whose category was detected but not refined
    CategoryDetected,
}

impl BatchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchScope::All => "all",
            BatchScope::Unprocessed => "unprocessed",
            BatchScope::CategoryDetected => "category_detected",
        }
    }
}

impl FromStr for BatchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(BatchScope::All),
            "unprocessed" => Ok(BatchScope::Unprocessed),
            "category_detected" => Ok(BatchScope::CategoryDetected),
            other => Err(format!("unknown batch scope: {}", other)),
        }
    }
}

/// Persisted batch job and its progress counters
///
/// `success_count <= processed <= total` holds at every observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub job_id: Uuid,
    pub stage: BatchStage,
    pub scope: BatchScope,
    pub status: BatchStatus,
    pub total: usize,
    pub processed: usize,
    pub success_count: usize,
    pub failed_count: usize,
    /// Mean confidence over successful items only
    pub avg_confidence: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl BatchJob {
    pub fn new(stage: BatchStage, scope: BatchScope, total: usize) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            stage,
            scope,
            status: BatchStatus::Idle,
            total,
            processed: 0,
            success_count: 0,
            failed_count: 0,
            avg_confidence: 0.0,
            started_at: Utc::now(),
            finished_at: None,
            last_error: None,
        }
    }

    /// Count a categorized item and fold its confidence into the mean
    pub fn record_success(&mut self, confidence: u8) {
        self.processed += 1;
        self.success_count += 1;
        let n = self.success_count as f64;
        self.avg_confidence += (f64::from(confidence) - self.avg_confidence) / n;
    }

    /// Count an item that ended uncategorized
    pub fn record_uncategorized(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.processed += 1;
        self.failed_count += 1;
        self.last_error = Some(error.into());
    }

    /// Move to a terminal status and stamp the finish time
    pub fn finish(&mut self, status: BatchStatus) {
        self.status = status;
        if status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn progress_percent(&self) -> f64 {
        if self.total > 0 {
            (self.processed as f64 / self.total as f64) * 100.0
        } else {
            100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_preserve_ordering_invariant() {
        let mut job = BatchJob::new(BatchStage::CategoryDetection, BatchScope::All, 4);
        job.record_success(80);
        job.record_uncategorized();
        job.record_failure("empty title");
        job.record_success(60);

        assert_eq!(job.processed, 4);
        assert_eq!(job.success_count, 2);
        assert_eq!(job.failed_count, 1);
        assert!(job.success_count <= job.processed && job.processed <= job.total);
        assert!((job.avg_confidence - 70.0).abs() < 1e-9);
        assert_eq!(job.last_error.as_deref(), Some("empty title"));
    }

    #[test]
    fn test_stage_serializes_as_number() {
        assert_eq!(
            serde_json::to_value(BatchStage::ProfitRefinement).unwrap(),
            serde_json::json!(2)
        );
        assert!(serde_json::from_value::<BatchStage>(serde_json::json!(3)).is_err());
    }

    #[test]
    fn test_finish_sets_timestamp_only_when_terminal() {
        let mut job = BatchJob::new(BatchStage::CategoryDetection, BatchScope::All, 0);
        job.finish(BatchStatus::Running);
        assert!(job.finished_at.is_none());
        job.finish(BatchStatus::Cancelled);
        assert!(job.finished_at.is_some());
        assert_eq!(job.progress_percent(), 100.0);
    }
}
