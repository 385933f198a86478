//! Batch classification orchestrator
//!
//! One sequential worker task per job. Cancellation is cooperative: the
//! worker checks its token before each item and while sleeping between
//! items. Progress is persisted and broadcast after every item so that
//! `success_count <= processed <= total` holds at every observation.

use chrono::Utc;
use resale_common::events::{EventBus, ResaleEvent};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::catalog::CatalogSet;
use crate::db;
use crate::models::{
    BatchJob, BatchScope, BatchStage, BatchStatus, ClassifierParameters, ProductRecord,
    ProductStatus,
};
use crate::services::classification_engine::ClassificationEngine;
use crate::services::fee_resolver::FeeResolver;
use crate::utils::RetryPolicy;

/// Largest accepted chunk size
pub const MAX_BATCH_SIZE: usize = 1000;

/// Batch orchestration errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// A job for the same stage is already idle or running
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Batch job not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Persistence(#[from] resale_common::Error),
}

/// Parameters of `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRequest {
    pub stage: BatchStage,
    pub scope: BatchScope,
    /// Products loaded from the database per round trip
    pub batch_size: usize,
    /// Cap on the number of products processed
    pub limit: Option<usize>,
}

/// Starts, tracks and pauses batch jobs
pub struct BatchOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    catalog: Arc<CatalogSet>,
    fee_resolver: FeeResolver,
    cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Serializes the active-job check with job creation
    start_lock: Mutex<()>,
}

impl BatchOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        catalog: Arc<CatalogSet>,
        fee_resolver: FeeResolver,
    ) -> Self {
        Self {
            db,
            event_bus,
            catalog,
            fee_resolver,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            start_lock: Mutex::new(()),
        }
    }

    /// Snapshot the queue, persist the job and spawn its worker
    ///
    /// Returns the job id and the number of products it will process.
    pub async fn start(&self, request: BatchRequest) -> Result<(Uuid, usize), BatchError> {
        if request.batch_size == 0 || request.batch_size > MAX_BATCH_SIZE {
            return Err(BatchError::InvalidRequest(format!(
                "batch_size must be 1-{} (got {})",
                MAX_BATCH_SIZE, request.batch_size
            )));
        }

        let _guard = self.start_lock.lock().await;

        if db::batch_jobs::has_active_job(&self.db, request.stage).await? {
            return Err(BatchError::Conflict(format!(
                "A stage {} batch job is already running",
                request.stage.as_u8()
            )));
        }

        let params = db::parameters::load_classifier_parameters(&self.db).await?;
        let queue =
            db::products::select_queue(&self.db, request.stage, request.scope, request.limit)
                .await?;

        let job = BatchJob::new(request.stage, request.scope, queue.len());
        db::batch_jobs::save_job(&self.db, &job, params.max_lock_wait_ms).await?;

        let job_id = job.job_id;
        let target_count = queue.len();
        let token = CancellationToken::new();
        self.cancellation_tokens
            .write()
            .await
            .insert(job_id, token.clone());

        tracing::info!(
            job_id = %job_id,
            stage = request.stage.as_u8(),
            scope = request.scope.as_str(),
            target_count,
            "Starting batch job"
        );

        let worker = BatchWorker {
            db: self.db.clone(),
            event_bus: self.event_bus.clone(),
            engine: ClassificationEngine::new(self.db.clone(), self.catalog.clone(), params.clone()),
            fee_resolver: self
                .fee_resolver
                .clone()
                .with_retry_policy(RetryPolicy::from(&params)),
            cancellation_tokens: self.cancellation_tokens.clone(),
            params,
        };
        tokio::spawn(worker.run(job, queue, request.batch_size, token));

        Ok((job_id, target_count))
    }

    pub async fn get_progress(&self, job_id: Uuid) -> Result<BatchJob, BatchError> {
        db::batch_jobs::load_job(&self.db, job_id)
            .await?
            .ok_or(BatchError::NotFound(job_id))
    }

    /// Request cancellation of a job
    ///
    /// The worker stops before its next item; poll progress for the final
    /// `cancelled` status. A job with no live worker (left over from a
    /// previous process) is cancelled immediately.
    pub async fn pause(&self, job_id: Uuid) -> Result<BatchJob, BatchError> {
        let mut job = self.get_progress(job_id).await?;
        if job.status.is_terminal() {
            return Err(BatchError::InvalidRequest(format!(
                "Batch job {} already {}",
                job_id, job.status
            )));
        }

        let token = self.cancellation_tokens.read().await.get(&job_id).cloned();
        match token {
            Some(token) => {
                tracing::info!(job_id = %job_id, "Cancellation requested");
                token.cancel();
            }
            None => {
                // The worker may have finished between the load above and now
                job = self.get_progress(job_id).await?;
                if !job.status.is_terminal() {
                    tracing::warn!(job_id = %job_id, "No live worker for job, marking cancelled");
                    let params = db::parameters::load_classifier_parameters(&self.db).await?;
                    job.finish(BatchStatus::Cancelled);
                    db::batch_jobs::save_job(&self.db, &job, params.max_lock_wait_ms).await?;
                }
            }
        }

        Ok(job)
    }

    /// Number of jobs with a live worker
    pub async fn active_job_count(&self) -> usize {
        self.cancellation_tokens.read().await.len()
    }
}

/// State owned by one job's worker task
struct BatchWorker {
    db: SqlitePool,
    event_bus: EventBus,
    engine: ClassificationEngine,
    fee_resolver: FeeResolver,
    cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    params: ClassifierParameters,
}

impl BatchWorker {
    async fn run(
        self,
        mut job: BatchJob,
        queue: Vec<String>,
        batch_size: usize,
        token: CancellationToken,
    ) {
        let job_id = job.job_id;
        let stage = job.stage;

        job.status = BatchStatus::Running;
        self.persist(&job).await;
        self.event_bus.emit_lossy(ResaleEvent::BatchJobStarted {
            job_id,
            stage: stage.as_u8(),
            total: job.total,
            timestamp: Utc::now(),
        });

        let delay = Duration::from_millis(self.params.inter_item_delay_ms);
        let final_status = 'outer: {
            for chunk in queue.chunks(batch_size) {
                if token.is_cancelled() {
                    break 'outer BatchStatus::Cancelled;
                }

                let mut products: HashMap<String, ProductRecord> =
                    match db::products::load_products(&self.db, chunk).await {
                        Ok(loaded) => loaded
                            .into_iter()
                            .map(|p| (p.product_id.clone(), p))
                            .collect(),
                        Err(e) => {
                            tracing::error!(job_id = %job_id, error = %e, "Failed to load batch queue");
                            job.last_error = Some(format!("Failed to load products: {}", e));
                            break 'outer BatchStatus::Failed;
                        }
                    };

                for product_id in chunk {
                    if token.is_cancelled() {
                        break 'outer BatchStatus::Cancelled;
                    }

                    let outcome = match products.remove(product_id) {
                        Some(product) => self.process_item(stage, &product).await,
                        None => Err(format!("product {} no longer exists", product_id)),
                    };

                    match outcome {
                        Ok(Some(confidence)) => job.record_success(confidence),
                        Ok(None) => job.record_uncategorized(),
                        Err(message) => {
                            tracing::warn!(
                                job_id = %job_id,
                                product_id = %product_id,
                                error = %message,
                                "Batch item failed"
                            );
                            if let Err(e) = db::products::record_failure(
                                &self.db,
                                product_id,
                                &message,
                                self.params.max_lock_wait_ms,
                            )
                            .await
                            {
                                tracing::warn!(
                                    product_id = %product_id,
                                    error = %e,
                                    "Failed to record item failure"
                                );
                            }
                            job.record_failure(message);
                        }
                    }

                    self.persist(&job).await;
                    self.emit_progress(&job);

                    if !delay.is_zero() && job.processed < job.total {
                        let cancelled = tokio::select! {
                            _ = tokio::time::sleep(delay) => false,
                            _ = token.cancelled() => true,
                        };
                        if cancelled {
                            break 'outer BatchStatus::Cancelled;
                        }
                    }
                }
            }
            BatchStatus::Completed
        };

        job.finish(final_status);
        self.persist(&job).await;
        self.event_bus.emit_lossy(ResaleEvent::BatchJobFinished {
            job_id,
            stage: stage.as_u8(),
            status: final_status.as_str().to_string(),
            processed: job.processed,
            success_count: job.success_count,
            timestamp: Utc::now(),
        });
        self.cancellation_tokens.write().await.remove(&job_id);

        tracing::info!(
            job_id = %job_id,
            status = %final_status,
            processed = job.processed,
            success_count = job.success_count,
            failed_count = job.failed_count,
            avg_confidence = job.avg_confidence,
            "Batch job finished"
        );
    }

    /// Classify one product and store the outcome on it
    ///
    /// `Ok(Some(confidence))` for a categorized item, `Ok(None)` for an
    /// uncategorized one, `Err` when the item failed.
    async fn process_item(
        &self,
        stage: BatchStage,
        product: &ProductRecord,
    ) -> Result<Option<u8>, String> {
        let descriptor = product.descriptor();

        let baseline = match (stage, product.stored_classification()) {
            (BatchStage::ProfitRefinement, Some(stored)) => stored,
            _ => self
                .engine
                .classify_stage1(&descriptor)
                .await
                .map_err(|e| e.to_string())?,
        };
        let result = match stage {
            BatchStage::CategoryDetection => baseline.clone(),
            BatchStage::ProfitRefinement => self
                .engine
                .refine(baseline.clone(), descriptor.price_minor_units),
        };

        let fee = match result.category_id.as_deref() {
            Some(category_id) => Some(
                self.fee_resolver
                    .resolve(category_id, descriptor.price_minor_units)
                    .await
                    .map_err(|e| e.to_string())?,
            ),
            None => None,
        };

        let status = match stage {
            BatchStage::CategoryDetection if result.is_uncategorized() => ProductStatus::Unprocessed,
            BatchStage::CategoryDetection => ProductStatus::CategoryDetected,
            BatchStage::ProfitRefinement => ProductStatus::ProfitRefined,
        };

        if let Err(e) = db::products::record_classification(
            &self.db,
            &product.product_id,
            status,
            &baseline,
            &result,
            fee.as_ref(),
            self.params.max_lock_wait_ms,
        )
        .await
        {
            tracing::warn!(
                product_id = %product.product_id,
                error = %e,
                "Failed to store classification on product"
            );
        }

        Ok(result.category_id.as_ref().map(|_| result.confidence))
    }

    async fn persist(&self, job: &BatchJob) {
        if let Err(e) = db::batch_jobs::save_job(&self.db, job, self.params.max_lock_wait_ms).await {
            tracing::warn!(job_id = %job.job_id, error = %e, "Failed to persist batch progress");
        }
    }

    fn emit_progress(&self, job: &BatchJob) {
        self.event_bus.emit_lossy(ResaleEvent::BatchProgressUpdate {
            job_id: job.job_id,
            stage: job.stage.as_u8(),
            processed: job.processed,
            total: job.total,
            success_count: job.success_count,
            failed_count: job.failed_count,
            avg_confidence: job.avg_confidence,
            timestamp: Utc::now(),
        });
    }
}
