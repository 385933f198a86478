//! Stage 2: profit-aware refinement
//!
//! Adjusts the confidence of a Stage 1 (or cached) result using historical
//! bootstrap patterns for its category. The category itself never changes.

use std::sync::Arc;

use crate::catalog::{BootstrapPattern, CatalogSet};
use crate::models::{
    ClassificationMethod, ClassificationResult, ClassifierParameters, AUTO_CONFIDENCE_CEILING,
    HUMAN_VERIFIED_CONFIDENCE,
};

/// Stage 2 classifier
#[derive(Debug, Clone)]
pub struct ProfitEnhancedClassifier {
    catalog: Arc<CatalogSet>,
}

impl ProfitEnhancedClassifier {
    pub fn new(catalog: Arc<CatalogSet>) -> Self {
        Self { catalog }
    }

    /// Refine `result` for a listing at `price`
    ///
    /// - no bootstrap history: unchanged, improvement 0
    /// - a band contains the price: bonus scaled by closeness to its sweet
    ///   spot, profit margin and potential reported
    /// - history exists but no band fits: fixed penalty
    ///
    /// A category counts as matched once it has any bootstrap history, so
    /// only the first case returns the input as is. A price outside every
    /// band of a known category is a mismatch: it takes
    /// `stage2_mismatch_penalty` and the method becomes learned-and-refined.
    /// Set the penalty to 0 to leave such prices unscored.
    ///
    /// Human-verified results keep confidence 100 and their method.
    pub fn refine(
        &self,
        result: ClassificationResult,
        price: i64,
        params: &ClassifierParameters,
    ) -> ClassificationResult {
        let Some(category_id) = result.category_id.as_deref() else {
            return ClassificationResult {
                confidence_improvement: Some(0),
                ..result
            };
        };

        let patterns = self.catalog.bootstrap.for_category(category_id);
        if patterns.is_empty() {
            return ClassificationResult {
                confidence_improvement: Some(0),
                ..result
            };
        }

        let human_verified = result.is_human_verified();
        let ceiling = if human_verified {
            HUMAN_VERIFIED_CONFIDENCE
        } else {
            AUTO_CONFIDENCE_CEILING
        };
        let before = result.confidence;

        let (after, margin) = match best_band(patterns, price) {
            Some((band, closeness)) => {
                let bonus = (f64::from(params.stage2_max_bonus) * closeness).round() as u8;
                (before.saturating_add(bonus).min(ceiling), Some(band))
            }
            None => (before.saturating_sub(params.stage2_mismatch_penalty), None),
        };
        // Corrections are authoritative; refinement may annotate but not lower them
        let after = if human_verified { HUMAN_VERIFIED_CONFIDENCE } else { after };

        let method = if human_verified {
            ClassificationMethod::HumanVerified
        } else {
            ClassificationMethod::LearnedAndRefined
        };

        tracing::debug!(
            category_id,
            before,
            after,
            band_matched = margin.is_some(),
            "Stage 2 refinement"
        );

        ClassificationResult {
            confidence: after,
            method,
            profit_margin: margin.map(|band| band.profit_margin_percent),
            profit_potential: margin
                .map(|band| (price as f64 * band.profit_margin_percent / 100.0).round() as i64),
            confidence_improvement: Some(i32::from(after) - i32::from(before)),
            ..result
        }
    }
}

/// The containing band whose sweet spot is closest to `price`
fn best_band(patterns: &[BootstrapPattern], price: i64) -> Option<(&BootstrapPattern, f64)> {
    patterns
        .iter()
        .filter(|band| band.contains(price))
        .map(|band| (band, band.closeness(price)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryCandidate;

    fn classifier() -> ProfitEnhancedClassifier {
        ProfitEnhancedClassifier::new(Arc::new(CatalogSet::embedded_default().unwrap()))
    }

    fn result(category_id: &str, confidence: u8, method: ClassificationMethod) -> ClassificationResult {
        ClassificationResult::from_candidate(
            CategoryCandidate {
                category_id: Some(category_id.to_string()),
                category_name: Some("name".to_string()),
                confidence,
                matched_keywords: vec![],
            },
            method,
        )
    }

    #[test]
    fn test_sweet_spot_gets_full_bonus() {
        let refined = classifier().refine(
            result("31388", 70, ClassificationMethod::Heuristic),
            220000,
            &ClassifierParameters::default(),
        );
        assert_eq!(refined.category_id.as_deref(), Some("31388"));
        assert_eq!(refined.confidence, 85);
        assert_eq!(refined.confidence_improvement, Some(15));
        assert_eq!(refined.method, ClassificationMethod::LearnedAndRefined);
        assert_eq!(refined.profit_margin, Some(18.0));
        assert_eq!(refined.profit_potential, Some(39600));
    }

    #[test]
    fn test_bonus_respects_ceiling() {
        let refined = classifier().refine(
            result("31388", 95, ClassificationMethod::Learned),
            220000,
            &ClassifierParameters::default(),
        );
        assert_eq!(refined.confidence, 99);
        assert_eq!(refined.confidence_improvement, Some(4));
    }

    #[test]
    fn test_out_of_band_price_is_penalized() {
        let refined = classifier().refine(
            result("31388", 60, ClassificationMethod::Heuristic),
            900000,
            &ClassifierParameters::default(),
        );
        assert_eq!(refined.confidence, 55);
        assert_eq!(refined.confidence_improvement, Some(-5));
        assert!(refined.profit_margin.is_none());

        let floor = classifier().refine(
            result("31388", 3, ClassificationMethod::Heuristic),
            900000,
            &ClassifierParameters::default(),
        );
        assert_eq!(floor.confidence, 0);
        assert_eq!(floor.confidence_improvement, Some(-3));
    }

    #[test]
    fn test_zero_penalty_keeps_out_of_band_confidence() {
        let params = ClassifierParameters {
            stage2_mismatch_penalty: 0,
            ..Default::default()
        };
        let refined = classifier().refine(
            result("31388", 60, ClassificationMethod::Heuristic),
            900000,
            &params,
        );
        assert_eq!(refined.confidence, 60);
        assert_eq!(refined.confidence_improvement, Some(0));
        assert_eq!(refined.method, ClassificationMethod::LearnedAndRefined);
        assert!(refined.profit_margin.is_none());
    }

    #[test]
    fn test_no_history_leaves_result_unchanged() {
        let input = result("293", 40, ClassificationMethod::Heuristic);
        let refined = classifier().refine(input.clone(), 5000, &ClassifierParameters::default());
        assert_eq!(refined.confidence, 40);
        assert_eq!(refined.method, ClassificationMethod::Heuristic);
        assert_eq!(refined.confidence_improvement, Some(0));
    }

    #[test]
    fn test_human_verified_stays_at_100() {
        let refined = classifier().refine(
            result("31388", 100, ClassificationMethod::HumanVerified),
            900000,
            &ClassifierParameters::default(),
        );
        assert_eq!(refined.confidence, 100);
        assert_eq!(refined.method, ClassificationMethod::HumanVerified);
        assert_eq!(refined.confidence_improvement, Some(0));
    }

    #[test]
    fn test_picks_band_containing_price() {
        // 55000 is the sweet spot of the lower camera band
        let refined = classifier().refine(
            result("31388", 50, ClassificationMethod::Heuristic),
            55000,
            &ClassifierParameters::default(),
        );
        assert_eq!(refined.confidence, 65);
        assert_eq!(refined.profit_margin, Some(11.5));
    }
}
