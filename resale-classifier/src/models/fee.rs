//! Fee quotes

use serde::{Deserialize, Serialize};

/// Fee outcome for one (category, price) pair
///
/// When the schedule has no row for the category only `category_id` and
/// `has_fee_error` are serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_value_fee_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_value_fee_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_fee_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_fee_amount: Option<i64>,
    #[serde(default)]
    pub has_fee_error: bool,
}

impl FeeQuote {
    pub fn missing(category_id: impl Into<String>) -> Self {
        Self {
            category_id: category_id.into(),
            final_value_fee_percent: None,
            final_value_fee_amount: None,
            payment_fee_amount: None,
            total_fee_amount: None,
            has_fee_error: true,
        }
    }
}

/// Marketplace-wide payment processing fee
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentFeeSettings {
    pub percent: f64,
    pub fixed_minor_units: i64,
}

impl Default for PaymentFeeSettings {
    fn default() -> Self {
        Self {
            percent: 3.0,
            fixed_minor_units: 40,
        }
    }
}
