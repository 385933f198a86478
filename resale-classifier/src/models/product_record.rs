//! Persisted products feeding the batch queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ClassificationMethod, ClassificationResult, ProductDescriptor};

/// Where a product is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Unprocessed,
    CategoryDetected,
    ProfitRefined,
    Failed,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Unprocessed => "unprocessed",
            ProductStatus::CategoryDetected => "category_detected",
            ProductStatus::ProfitRefined => "profit_refined",
            ProductStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprocessed" => Ok(ProductStatus::Unprocessed),
            "category_detected" => Ok(ProductStatus::CategoryDetected),
            "profit_refined" => Ok(ProductStatus::ProfitRefined),
            "failed" => Ok(ProductStatus::Failed),
            other => Err(format!("unknown product status: {}", other)),
        }
    }
}

/// A scraped product with its latest classification and fee outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub price_minor_units: i64,
    pub source_category: Option<String>,
    pub status: ProductStatus,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub confidence: Option<u8>,
    pub method: Option<ClassificationMethod>,
    pub profit_margin: Option<f64>,
    pub profit_potential: Option<i64>,
    pub confidence_improvement: Option<i32>,
    /// Stage 1 outcome the current result was derived from
    pub stage1_confidence: Option<u8>,
    pub stage1_method: Option<ClassificationMethod>,
    pub fee_total_minor_units: Option<i64>,
    pub has_fee_error: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
    pub fn descriptor(&self) -> ProductDescriptor {
        ProductDescriptor {
            title: self.title.clone(),
            brand: self.brand.clone(),
            price_minor_units: self.price_minor_units,
            source_category: self.source_category.clone(),
        }
    }

    /// Stored Stage 1 (or cache) outcome, if category detection has run
    ///
    /// Stage 2 batches start from this instead of classifying again. A
    /// refined result is never returned as the baseline: without a stored
    /// Stage 1 outcome the caller has to classify again.
    pub fn stored_classification(&self) -> Option<ClassificationResult> {
        let category_id = self.category_id.clone()?;
        let (confidence, method) = match (self.stage1_confidence, self.stage1_method) {
            (Some(confidence), Some(method)) => (confidence, method),
            _ => match self.method? {
                ClassificationMethod::LearnedAndRefined => return None,
                method => (self.confidence.unwrap_or(0), method),
            },
        };
        Some(ClassificationResult {
            category_id: Some(category_id),
            category_name: self.category_name.clone(),
            confidence,
            method,
            matched_keywords: Vec::new(),
            profit_margin: None,
            profit_potential: None,
            confidence_improvement: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProductRecord {
        let now = Utc::now();
        ProductRecord {
            product_id: "p1".into(),
            title: "Canon EOS R6".into(),
            brand: Some("Canon".into()),
            price_minor_units: 180000,
            source_category: None,
            status: ProductStatus::Unprocessed,
            category_id: None,
            category_name: None,
            confidence: None,
            method: None,
            profit_margin: None,
            profit_potential: None,
            confidence_improvement: None,
            stage1_confidence: None,
            stage1_method: None,
            fee_total_minor_units: None,
            has_fee_error: false,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_stored_classification_before_detection() {
        assert!(record().stored_classification().is_none());
    }

    #[test]
    fn test_stored_classification_after_detection() {
        let mut product = record();
        product.category_id = Some("31388".into());
        product.category_name = Some("Digital Cameras".into());
        product.confidence = Some(72);
        product.method = Some(ClassificationMethod::Heuristic);

        let stored = product.stored_classification().unwrap();
        assert_eq!(stored.category_id.as_deref(), Some("31388"));
        assert_eq!(stored.confidence, 72);
        assert_eq!(product.descriptor().brand.as_deref(), Some("Canon"));
    }

    #[test]
    fn test_refined_record_yields_stage1_baseline() {
        let mut product = record();
        product.category_id = Some("31388".into());
        product.confidence = Some(90);
        product.method = Some(ClassificationMethod::LearnedAndRefined);
        product.confidence_improvement = Some(-5);
        product.stage1_confidence = Some(95);
        product.stage1_method = Some(ClassificationMethod::Learned);

        let stored = product.stored_classification().unwrap();
        assert_eq!(stored.confidence, 95);
        assert_eq!(stored.method, ClassificationMethod::Learned);
        assert!(stored.confidence_improvement.is_none());

        // Refined result without its baseline: classify again
        product.stage1_confidence = None;
        product.stage1_method = None;
        assert!(product.stored_classification().is_none());
    }
}
