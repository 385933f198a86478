//! Bootstrap profitability patterns used by Stage 2

use resale_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Historical sell-through pattern for a category within a price band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapPattern {
    pub category_id: String,
    pub price_min: i64,
    pub price_max: i64,
    /// Price at which this band historically performed best
    pub sweet_spot: i64,
    pub profit_margin_percent: f64,
}

impl BootstrapPattern {
    pub fn contains(&self, price: i64) -> bool {
        self.price_min <= price && price <= self.price_max
    }

    /// 1.0 at the sweet spot, falling linearly to 0.0 at the range edge on
    /// the price's side. 0.0 outside the range.
    pub fn closeness(&self, price: i64) -> f64 {
        if !self.contains(price) {
            return 0.0;
        }
        let (distance, span) = if price <= self.sweet_spot {
            (self.sweet_spot - price, self.sweet_spot - self.price_min)
        } else {
            (price - self.sweet_spot, self.price_max - self.sweet_spot)
        };
        if span <= 0 {
            return 1.0;
        }
        (1.0 - distance as f64 / span as f64).clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<()> {
        if self.price_min > self.price_max {
            return Err(Error::Config(format!(
                "bootstrap pattern for {}: price_min {} exceeds price_max {}",
                self.category_id, self.price_min, self.price_max
            )));
        }
        if !self.contains(self.sweet_spot) {
            return Err(Error::Config(format!(
                "bootstrap pattern for {}: sweet_spot {} outside [{}, {}]",
                self.category_id, self.sweet_spot, self.price_min, self.price_max
            )));
        }
        if !self.profit_margin_percent.is_finite() {
            return Err(Error::Config(format!(
                "bootstrap pattern for {}: profit margin is not a number",
                self.category_id
            )));
        }
        Ok(())
    }
}

/// Bootstrap patterns grouped by category
#[derive(Debug, Clone, Default)]
pub struct BootstrapTable {
    by_category: HashMap<String, Vec<BootstrapPattern>>,
}

impl BootstrapTable {
    pub fn new(patterns: Vec<BootstrapPattern>) -> Result<Self> {
        let mut by_category: HashMap<String, Vec<BootstrapPattern>> = HashMap::new();
        for pattern in patterns {
            pattern.validate()?;
            by_category
                .entry(pattern.category_id.clone())
                .or_default()
                .push(pattern);
        }
        Ok(Self { by_category })
    }

    /// Patterns for a category; empty when the category has no history
    pub fn for_category(&self, category_id: &str) -> &[BootstrapPattern] {
        self.by_category
            .get(category_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }
}
