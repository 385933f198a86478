//! Fee resolution
//!
//! Joins a (category, price) pair to the fee schedule. A category without
//! fee terms yields `has_fee_error: true`; that never blocks
//! classification.

use std::sync::Arc;

use crate::catalog::{CatalogSet, FeeScheduleRow};
use crate::error::ClassifyError;
use crate::models::{FeeQuote, PaymentFeeSettings};
use crate::services::fee_client::RemoteFeeClient;
use crate::utils::{retry_transient, RetryPolicy};

/// Fee arithmetic for one schedule row
///
/// final value fee = round(price * percent / 100), capped, plus the per-order
/// fee; payment fee = round(price * payment percent / 100) plus the fixed fee.
/// Amounts saturate at `i64::MAX`.
pub fn quote_from_row(
    category_id: &str,
    row: Option<&FeeScheduleRow>,
    price: i64,
    payment: PaymentFeeSettings,
) -> FeeQuote {
    let Some(row) = row else {
        return FeeQuote::missing(category_id);
    };

    let percentage_fee = (price as f64 * row.final_value_fee_percent / 100.0).round() as i64;
    let percentage_fee = match row.fee_cap_minor_units {
        Some(cap) => percentage_fee.min(cap),
        None => percentage_fee,
    };
    let final_value_fee = percentage_fee.saturating_add(row.per_order_fee_minor_units);
    let payment_fee = ((price as f64 * payment.percent / 100.0).round() as i64)
        .saturating_add(payment.fixed_minor_units);

    FeeQuote {
        category_id: category_id.to_string(),
        final_value_fee_percent: Some(row.final_value_fee_percent),
        final_value_fee_amount: Some(final_value_fee),
        payment_fee_amount: Some(payment_fee),
        total_fee_amount: Some(final_value_fee.saturating_add(payment_fee)),
        has_fee_error: false,
    }
}

/// Resolves fee quotes from the local schedule and an optional fee service
#[derive(Debug, Clone)]
pub struct FeeResolver {
    catalog: Arc<CatalogSet>,
    payment: PaymentFeeSettings,
    remote: Option<RemoteFeeClient>,
    retry: RetryPolicy,
}

impl FeeResolver {
    pub fn new(catalog: Arc<CatalogSet>, payment: PaymentFeeSettings) -> Self {
        Self {
            catalog,
            payment,
            remote: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_remote(mut self, client: RemoteFeeClient) -> Self {
        self.remote = Some(client);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Quote from the local schedule only; pure
    pub fn quote(&self, category_id: &str, price: i64) -> FeeQuote {
        quote_from_row(
            category_id,
            self.catalog.fees.get(category_id),
            price,
            self.payment,
        )
    }

    /// Quote a category at `price`
    ///
    /// With a fee service configured its row takes precedence; when the
    /// service has no row the local schedule is used. A service that stays
    /// unavailable after the retry budget is an `ExternalLookup` error.
    pub async fn resolve(&self, category_id: &str, price: i64) -> Result<FeeQuote, ClassifyError> {
        let Some(remote) = &self.remote else {
            return Ok(self.quote(category_id, price));
        };

        let timeout = self.retry.timeout;
        let fetched = retry_transient(
            "fee_lookup",
            self.retry,
            |e: &crate::services::fee_client::FeeClientError| e.is_transient(),
            |_attempt| remote.fetch_row(category_id, timeout),
        )
        .await
        .map_err(|exhausted| ClassifyError::ExternalLookup {
            service: "fee_service".to_string(),
            attempts: exhausted.attempts,
            message: exhausted.last_error.to_string(),
        })?;

        Ok(match fetched {
            Some(row) => quote_from_row(category_id, Some(&row), price, self.payment),
            None => self.quote(category_id, price),
        })
    }
}
