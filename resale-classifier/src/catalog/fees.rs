//! Marketplace fee schedule

use resale_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Final-value fee terms for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeScheduleRow {
    pub category_id: String,
    pub final_value_fee_percent: f64,
    /// Upper bound on the percentage part of the fee
    #[serde(default)]
    pub fee_cap_minor_units: Option<i64>,
    #[serde(default)]
    pub per_order_fee_minor_units: i64,
}

impl FeeScheduleRow {
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.final_value_fee_percent.is_finite()
            || !(0.0..=100.0).contains(&self.final_value_fee_percent)
        {
            return Err(Error::Config(format!(
                "fee row for {}: final_value_fee_percent {} must be 0-100",
                self.category_id, self.final_value_fee_percent
            )));
        }
        if self.fee_cap_minor_units.is_some_and(|cap| cap < 0) || self.per_order_fee_minor_units < 0 {
            return Err(Error::Config(format!(
                "fee row for {}: amounts must not be negative",
                self.category_id
            )));
        }
        Ok(())
    }
}

/// Fee rows keyed by category id
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    rows: HashMap<String, FeeScheduleRow>,
}

impl FeeSchedule {
    pub fn new(rows: Vec<FeeScheduleRow>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(rows.len());
        for row in rows {
            row.validate()?;
            let id = row.category_id.clone();
            if by_id.insert(id.clone(), row).is_some() {
                return Err(Error::Config(format!("duplicate fee row for category {}", id)));
            }
        }
        Ok(Self { rows: by_id })
    }

    pub fn get(&self, category_id: &str) -> Option<&FeeScheduleRow> {
        self.rows.get(category_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
