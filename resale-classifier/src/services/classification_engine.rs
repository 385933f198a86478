//! Single-item classification pipeline
//!
//! pattern cache → (miss) Stage 1 + write-back → optional Stage 2.
//!
//! Cache and write-back failures degrade to the uncached path: the caller
//! still gets a classification and the failure is logged.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::catalog::CatalogSet;
use crate::error::ClassifyError;
use crate::models::{
    ClassificationMethod, ClassificationResult, ClassifierParameters, LearnedPattern,
    PatternStats, ProductDescriptor,
};
use crate::services::keyword_classifier::KeywordHeuristicClassifier;
use crate::services::pattern_store::{hit_confidence, LearnedPatternStore};
use crate::services::profit_classifier::ProfitEnhancedClassifier;
use crate::services::title_normalizer::{normalize_text, signature};

/// Classification pipeline bound to one parameter snapshot
///
/// Cheap to construct; handlers and batch jobs build one per request or job
/// from the current parameters.
#[derive(Debug, Clone)]
pub struct ClassificationEngine {
    catalog: Arc<CatalogSet>,
    stage1: KeywordHeuristicClassifier,
    stage2: ProfitEnhancedClassifier,
    patterns: LearnedPatternStore,
    params: ClassifierParameters,
}

impl ClassificationEngine {
    pub fn new(db: SqlitePool, catalog: Arc<CatalogSet>, params: ClassifierParameters) -> Self {
        Self {
            stage1: KeywordHeuristicClassifier::new(catalog.clone()),
            stage2: ProfitEnhancedClassifier::new(catalog.clone()),
            patterns: LearnedPatternStore::new(db, params.max_lock_wait_ms),
            catalog,
            params,
        }
    }

    pub fn params(&self) -> &ClassifierParameters {
        &self.params
    }

    /// Full pipeline; Stage 2 runs when `refine` is set
    pub async fn classify(
        &self,
        product: &ProductDescriptor,
        refine: bool,
    ) -> Result<ClassificationResult, ClassifyError> {
        let result = self.classify_stage1(product).await?;
        if refine {
            Ok(self.refine(result, product.price_minor_units))
        } else {
            Ok(result)
        }
    }

    /// Category detection: learned pattern if cached, keyword heuristics otherwise
    pub async fn classify_stage1(
        &self,
        product: &ProductDescriptor,
    ) -> Result<ClassificationResult, ClassifyError> {
        product.validate()?;
        let signature = signature(&product.title);

        match self.patterns.lookup(&signature).await {
            Ok(Some(pattern)) => {
                tracing::debug!(
                    signature = %signature,
                    category_id = %pattern.category_id,
                    usage_count = pattern.usage_count,
                    "Learned pattern hit"
                );
                return Ok(result_from_pattern(&pattern));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    signature = %signature,
                    error = %e,
                    "Pattern lookup failed, falling back to heuristics"
                );
            }
        }

        let candidate = self.stage1.classify(product, &self.params);

        if let Err(e) = self.patterns.record_automatic(&signature, &candidate).await {
            tracing::warn!(
                signature = %signature,
                error = %e,
                "Failed to record learned pattern"
            );
        }

        Ok(ClassificationResult::from_candidate(
            candidate,
            ClassificationMethod::Heuristic,
        ))
    }

    /// Stage 2 over an existing result
    pub fn refine(&self, result: ClassificationResult, price: i64) -> ClassificationResult {
        self.stage2.refine(result, price, &self.params)
    }

    /// Pin `title` to a category as a human-verified pattern
    ///
    /// `category_name` defaults to the catalog's name for the id, then to
    /// the id itself for categories the catalog does not know.
    pub async fn correct(
        &self,
        title: &str,
        category_id: &str,
        category_name: Option<&str>,
    ) -> Result<LearnedPattern, ClassifyError> {
        if normalize_text(title).is_empty() {
            return Err(ClassifyError::Validation(
                "title contains no classifiable characters".to_string(),
            ));
        }
        let category_id = category_id.trim();
        if category_id.is_empty() {
            return Err(ClassifyError::Validation(
                "correct_category_id is required".to_string(),
            ));
        }

        let category_name = category_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| self.catalog.category_name(category_id))
            .unwrap_or(category_id);

        let signature = signature(title);
        let pattern = self
            .patterns
            .record_manual(&signature, category_id, category_name)
            .await?;

        tracing::info!(
            signature = %signature,
            category_id,
            "Stored manual category correction"
        );
        Ok(pattern)
    }

    pub async fn pattern_stats(&self) -> Result<PatternStats, ClassifyError> {
        Ok(self.patterns.stats(self.params.maturity_threshold).await?)
    }
}

fn result_from_pattern(pattern: &LearnedPattern) -> ClassificationResult {
    ClassificationResult {
        category_id: Some(pattern.category_id.clone()),
        category_name: Some(pattern.category_name.clone()),
        confidence: hit_confidence(pattern),
        method: if pattern.human_verified {
            ClassificationMethod::HumanVerified
        } else {
            ClassificationMethod::Learned
        },
        matched_keywords: Vec::new(),
        profit_margin: None,
        profit_potential: None,
        confidence_improvement: None,
    }
}
