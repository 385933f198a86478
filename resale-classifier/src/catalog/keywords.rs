//! Category keyword rules

use resale_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::services::title_normalizer::normalize_text;

/// A weighted term that votes for a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub term: String,
    pub weight: f64,
}

/// Expected listing price range; either bound may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl PriceRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// One target marketplace category and the hints that select it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price_min: Option<i64>,
    #[serde(default)]
    pub price_max: Option<i64>,
    #[serde(default)]
    pub brands: Vec<String>,
    /// Source-site category names that alias this category
    #[serde(default)]
    pub source_categories: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<KeywordRule>,
}

impl CategoryRule {
    pub fn price_range(&self) -> PriceRange {
        PriceRange {
            min: self.price_min,
            max: self.price_max,
        }
    }

    fn normalize(&mut self) {
        for keyword in &mut self.keywords {
            keyword.term = normalize_text(&keyword.term);
        }
        for brand in &mut self.brands {
            *brand = normalize_text(brand);
        }
        for source in &mut self.source_categories {
            *source = normalize_text(source);
        }
        self.brands.retain(|b| !b.is_empty());
        self.source_categories.retain(|s| !s.is_empty());
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Config("category id must not be empty".to_string()));
        }
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(Error::Config(format!(
                    "category {}: price_min {} exceeds price_max {}",
                    self.id, min, max
                )));
            }
        }
        for keyword in &self.keywords {
            if keyword.term.is_empty() {
                return Err(Error::Config(format!(
                    "category {}: keyword term is empty after normalization",
                    self.id
                )));
            }
            if !keyword.weight.is_finite() || keyword.weight <= 0.0 {
                return Err(Error::Config(format!(
                    "category {}: keyword '{}' has invalid weight {}",
                    self.id, keyword.term, keyword.weight
                )));
            }
        }
        Ok(())
    }
}

/// Validated, normalized keyword catalog
#[derive(Debug, Clone, Default)]
pub struct KeywordCatalog {
    categories: Vec<CategoryRule>,
}

impl KeywordCatalog {
    /// Normalize terms and reject malformed or duplicate categories
    pub fn new(mut categories: Vec<CategoryRule>) -> Result<Self> {
        let mut seen = HashSet::new();
        for category in &mut categories {
            category.normalize();
            category.validate()?;
            if !seen.insert(category.id.clone()) {
                return Err(Error::Config(format!(
                    "duplicate category id: {}",
                    category.id
                )));
            }
        }
        Ok(Self { categories })
    }

    pub fn get(&self, category_id: &str) -> Option<&CategoryRule> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryRule> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str) -> CategoryRule {
        CategoryRule {
            id: id.to_string(),
            name: format!("Category {}", id),
            price_min: Some(100),
            price_max: Some(1000),
            brands: vec!["Good Smile Company".to_string()],
            source_categories: vec![],
            keywords: vec![KeywordRule {
                term: "Ｆｉｇｕｒｅ".to_string(),
                weight: 2.0,
            }],
        }
    }

    #[test]
    fn test_terms_normalized_on_load() {
        let catalog = KeywordCatalog::new(vec![rule("1")]).unwrap();
        let category = catalog.get("1").unwrap();
        assert_eq!(category.keywords[0].term, "figure");
        assert_eq!(category.brands[0], "good smile company");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        assert!(KeywordCatalog::new(vec![rule("1"), rule("1")]).is_err());
    }

    #[test]
    fn test_inverted_range_and_bad_weight_rejected() {
        let mut inverted = rule("1");
        inverted.price_min = Some(2000);
        assert!(KeywordCatalog::new(vec![inverted]).is_err());

        let mut bad_weight = rule("2");
        bad_weight.keywords[0].weight = 0.0;
        assert!(KeywordCatalog::new(vec![bad_weight]).is_err());

        let mut blank_term = rule("3");
        blank_term.keywords[0].term = "--".to_string();
        assert!(KeywordCatalog::new(vec![blank_term]).is_err());
    }
}
