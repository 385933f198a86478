//! Runtime-tunable classifier parameters
//!
//! Persisted in the `settings` table under `classifier_*` keys and
//! editable through `/parameters/classifier`.

use serde::{Deserialize, Serialize};

/// Classifier tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParameters {
    /// Stage 1 results below this confidence become uncategorized (default: 10)
    #[serde(default = "default_min_confidence_floor")]
    pub min_confidence_floor: u8,

    /// A pattern is mature once usage_count exceeds this (default: 10)
    #[serde(default = "default_maturity_threshold")]
    pub maturity_threshold: i64,

    /// Relative distance outside a price range at which price fit reaches 0 (default: 0.5)
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: f64,

    /// Largest Stage 2 bonus, awarded at the sweet spot (default: 15)
    #[serde(default = "default_stage2_max_bonus")]
    pub stage2_max_bonus: u8,

    /// Stage 2 deduction when no bootstrap range contains the price (default: 5)
    #[serde(default = "default_stage2_mismatch_penalty")]
    pub stage2_mismatch_penalty: u8,

    /// Pause between batch items in milliseconds (default: 2000)
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,

    /// Per-attempt timeout for external calls (default: 5000ms)
    #[serde(default = "default_external_timeout_ms")]
    pub external_timeout_ms: u64,

    /// Attempts per external call including the first (default: 2)
    #[serde(default = "default_external_max_attempts")]
    pub external_max_attempts: u32,

    /// Time budget for retrying locked database writes (default: 5000ms)
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,
}

fn default_min_confidence_floor() -> u8 {
    10
}

fn default_maturity_threshold() -> i64 {
    10
}

fn default_price_tolerance() -> f64 {
    0.5
}

fn default_stage2_max_bonus() -> u8 {
    15
}

fn default_stage2_mismatch_penalty() -> u8 {
    5
}

fn default_inter_item_delay_ms() -> u64 {
    2000
}

fn default_external_timeout_ms() -> u64 {
    5000
}

fn default_external_max_attempts() -> u32 {
    2
}

fn default_max_lock_wait_ms() -> u64 {
    5000
}

impl Default for ClassifierParameters {
    fn default() -> Self {
        Self {
            min_confidence_floor: default_min_confidence_floor(),
            maturity_threshold: default_maturity_threshold(),
            price_tolerance: default_price_tolerance(),
            stage2_max_bonus: default_stage2_max_bonus(),
            stage2_mismatch_penalty: default_stage2_mismatch_penalty(),
            inter_item_delay_ms: default_inter_item_delay_ms(),
            external_timeout_ms: default_external_timeout_ms(),
            external_max_attempts: default_external_max_attempts(),
            max_lock_wait_ms: default_max_lock_wait_ms(),
        }
    }
}

impl ClassifierParameters {
    /// Check ranges; returns the first violation
    pub fn validate(&self) -> Result<(), String> {
        if self.min_confidence_floor > 100 {
            return Err(format!(
                "min_confidence_floor must be 0-100 (got {})",
                self.min_confidence_floor
            ));
        }
        if self.maturity_threshold < 0 {
            return Err(format!(
                "maturity_threshold must not be negative (got {})",
                self.maturity_threshold
            ));
        }
        if !self.price_tolerance.is_finite() || self.price_tolerance <= 0.0 {
            return Err(format!(
                "price_tolerance must be a positive number (got {})",
                self.price_tolerance
            ));
        }
        if self.stage2_max_bonus > 100 || self.stage2_mismatch_penalty > 100 {
            return Err("stage 2 bonus and penalty must be 0-100".to_string());
        }
        if self.external_max_attempts == 0 || self.external_max_attempts > 10 {
            return Err(format!(
                "external_max_attempts must be 1-10 (got {})",
                self.external_max_attempts
            ));
        }
        if self.external_timeout_ms == 0 {
            return Err("external_timeout_ms must be positive".to_string());
        }
        Ok(())
    }

    /// Apply a partial update, leaving unspecified fields unchanged
    pub fn merged(&self, update: &ClassifierParametersUpdate) -> Self {
        Self {
            min_confidence_floor: update.min_confidence_floor.unwrap_or(self.min_confidence_floor),
            maturity_threshold: update.maturity_threshold.unwrap_or(self.maturity_threshold),
            price_tolerance: update.price_tolerance.unwrap_or(self.price_tolerance),
            stage2_max_bonus: update.stage2_max_bonus.unwrap_or(self.stage2_max_bonus),
            stage2_mismatch_penalty: update
                .stage2_mismatch_penalty
                .unwrap_or(self.stage2_mismatch_penalty),
            inter_item_delay_ms: update.inter_item_delay_ms.unwrap_or(self.inter_item_delay_ms),
            external_timeout_ms: update.external_timeout_ms.unwrap_or(self.external_timeout_ms),
            external_max_attempts: update
                .external_max_attempts
                .unwrap_or(self.external_max_attempts),
            max_lock_wait_ms: update.max_lock_wait_ms.unwrap_or(self.max_lock_wait_ms),
        }
    }
}

/// Partial update body for `POST /parameters/classifier`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierParametersUpdate {
    pub min_confidence_floor: Option<u8>,
    pub maturity_threshold: Option<i64>,
    pub price_tolerance: Option<f64>,
    pub stage2_max_bonus: Option<u8>,
    pub stage2_mismatch_penalty: Option<u8>,
    pub inter_item_delay_ms: Option<u64>,
    pub external_timeout_ms: Option<u64>,
    pub external_max_attempts: Option<u32>,
    pub max_lock_wait_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = ClassifierParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.min_confidence_floor, 10);
        assert_eq!(params.inter_item_delay_ms, 2000);
    }

    #[test]
    fn test_empty_json_yields_defaults() {
        let params: ClassifierParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params, ClassifierParameters::default());
    }

    #[test]
    fn test_merge_keeps_unspecified_fields() {
        let base = ClassifierParameters::default();
        let update = ClassifierParametersUpdate {
            maturity_threshold: Some(3),
            ..Default::default()
        };
        let merged = base.merged(&update);
        assert_eq!(merged.maturity_threshold, 3);
        assert_eq!(merged.price_tolerance, base.price_tolerance);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut params = ClassifierParameters::default();
        params.price_tolerance = f64::NAN;
        assert!(params.validate().is_err());

        let mut params = ClassifierParameters::default();
        params.min_confidence_floor = 101;
        assert!(params.validate().is_err());

        let mut params = ClassifierParameters::default();
        params.external_max_attempts = 0;
        assert!(params.validate().is_err());
    }
}
