//! Classifier parameter persistence
//!
//! Load/save `ClassifierParameters` from the settings table. Missing keys
//! fall back to compiled defaults.

use resale_common::db::{get_setting, set_setting};
use resale_common::Result;
use sqlx::SqlitePool;

use crate::models::ClassifierParameters;

const KEY_MIN_CONFIDENCE_FLOOR: &str = "classifier_min_confidence_floor";
const KEY_MATURITY_THRESHOLD: &str = "classifier_maturity_threshold";
const KEY_PRICE_TOLERANCE: &str = "classifier_price_tolerance";
const KEY_STAGE2_MAX_BONUS: &str = "classifier_stage2_max_bonus";
const KEY_STAGE2_MISMATCH_PENALTY: &str = "classifier_stage2_mismatch_penalty";
const KEY_INTER_ITEM_DELAY_MS: &str = "classifier_inter_item_delay_ms";
const KEY_EXTERNAL_TIMEOUT_MS: &str = "classifier_external_timeout_ms";
const KEY_EXTERNAL_MAX_ATTEMPTS: &str = "classifier_external_max_attempts";
const KEY_MAX_LOCK_WAIT_MS: &str = "classifier_max_lock_wait_ms";

/// Load classifier parameters, defaulting any that are not stored
pub async fn load_classifier_parameters(pool: &SqlitePool) -> Result<ClassifierParameters> {
    let mut params = ClassifierParameters::default();

    if let Some(val) = get_setting(pool, KEY_MIN_CONFIDENCE_FLOOR).await? {
        params.min_confidence_floor = val;
    }
    if let Some(val) = get_setting(pool, KEY_MATURITY_THRESHOLD).await? {
        params.maturity_threshold = val;
    }
    if let Some(val) = get_setting(pool, KEY_PRICE_TOLERANCE).await? {
        params.price_tolerance = val;
    }
    if let Some(val) = get_setting(pool, KEY_STAGE2_MAX_BONUS).await? {
        params.stage2_max_bonus = val;
    }
    if let Some(val) = get_setting(pool, KEY_STAGE2_MISMATCH_PENALTY).await? {
        params.stage2_mismatch_penalty = val;
    }
    if let Some(val) = get_setting(pool, KEY_INTER_ITEM_DELAY_MS).await? {
        params.inter_item_delay_ms = val;
    }
    if let Some(val) = get_setting(pool, KEY_EXTERNAL_TIMEOUT_MS).await? {
        params.external_timeout_ms = val;
    }
    if let Some(val) = get_setting(pool, KEY_EXTERNAL_MAX_ATTEMPTS).await? {
        params.external_max_attempts = val;
    }
    if let Some(val) = get_setting(pool, KEY_MAX_LOCK_WAIT_MS).await? {
        params.max_lock_wait_ms = val;
    }

    Ok(params)
}

/// Save all classifier parameters
pub async fn save_classifier_parameters(
    pool: &SqlitePool,
    params: &ClassifierParameters,
) -> Result<()> {
    tracing::info!(?params, "Saving classifier parameters");

    set_setting(pool, KEY_MIN_CONFIDENCE_FLOOR, params.min_confidence_floor).await?;
    set_setting(pool, KEY_MATURITY_THRESHOLD, params.maturity_threshold).await?;
    set_setting(pool, KEY_PRICE_TOLERANCE, params.price_tolerance).await?;
    set_setting(pool, KEY_STAGE2_MAX_BONUS, params.stage2_max_bonus).await?;
    set_setting(pool, KEY_STAGE2_MISMATCH_PENALTY, params.stage2_mismatch_penalty).await?;
    set_setting(pool, KEY_INTER_ITEM_DELAY_MS, params.inter_item_delay_ms).await?;
    set_setting(pool, KEY_EXTERNAL_TIMEOUT_MS, params.external_timeout_ms).await?;
    set_setting(pool, KEY_EXTERNAL_MAX_ATTEMPTS, params.external_max_attempts).await?;
    set_setting(pool, KEY_MAX_LOCK_WAIT_MS, params.max_lock_wait_ms).await?;

    Ok(())
}
