//! Classification input

use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;
use crate::services::title_normalizer;

/// A scraped product as seen by the classifier
///
/// Never mutated by the engine; every stage borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub title: String,
    #[serde(default)]
    pub brand: Option<String>,
    /// Listing price in minor units of the listing currency
    #[serde(alias = "price")]
    pub price_minor_units: i64,
    /// Category path on the source site, if scraped
    #[serde(default)]
    pub source_category: Option<String>,
}

impl ProductDescriptor {
    pub fn new(title: impl Into<String>, price_minor_units: i64) -> Self {
        Self {
            title: title.into(),
            brand: None,
            price_minor_units,
            source_category: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_source_category(mut self, source_category: impl Into<String>) -> Self {
        self.source_category = Some(source_category.into());
        self
    }

    /// Reject inputs that cannot be classified
    ///
    /// A title made only of punctuation normalizes to nothing and would
    /// produce an empty signature, so it is rejected like an empty title.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.title.trim().is_empty() {
            return Err(ClassifyError::Validation("title is required".to_string()));
        }
        if title_normalizer::normalize_text(&self.title).is_empty() {
            return Err(ClassifyError::Validation(
                "title contains no classifiable characters".to_string(),
            ));
        }
        if self.price_minor_units < 0 {
            return Err(ClassifyError::Validation(format!(
                "price must not be negative (got {})",
                self.price_minor_units
            )));
        }
        Ok(())
    }
}
