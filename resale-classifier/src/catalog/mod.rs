//! Category catalog: keyword rules, bootstrap patterns and fee schedule
//!
//! All three tables ship in one TOML document. The default document is
//! compiled in; deployments point `catalog_path` at their own copy.

pub mod bootstrap;
pub mod fees;
pub mod keywords;

pub use bootstrap::{BootstrapPattern, BootstrapTable};
pub use fees::{FeeSchedule, FeeScheduleRow};
pub use keywords::{CategoryRule, KeywordCatalog, KeywordRule, PriceRange};

use resale_common::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_CATALOG: &str = include_str!("../../data/default_catalog.toml");

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    categories: Vec<CategoryRule>,
    #[serde(default)]
    bootstrap: Vec<BootstrapPattern>,
    #[serde(default)]
    fees: Vec<FeeScheduleRow>,
}

/// Read-only reference data shared by every classification
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    pub keywords: KeywordCatalog,
    pub bootstrap: BootstrapTable,
    pub fees: FeeSchedule,
}

impl CatalogSet {
    pub fn new(keywords: KeywordCatalog, bootstrap: BootstrapTable, fees: FeeSchedule) -> Self {
        let catalog = Self {
            keywords,
            bootstrap,
            fees,
        };
        catalog.warn_on_dangling_references();
        catalog
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let document: CatalogDocument = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse catalog: {}", e)))?;

        Ok(Self::new(
            KeywordCatalog::new(document.categories)?,
            BootstrapTable::new(document.bootstrap)?,
            FeeSchedule::new(document.fees)?,
        ))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            categories = catalog.keywords.len(),
            bootstrap_patterns = catalog.bootstrap.len(),
            fee_rows = catalog.fees.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// The catalog compiled into the binary
    pub fn embedded_default() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CATALOG)
    }

    pub fn category_name(&self, category_id: &str) -> Option<&str> {
        self.keywords.get(category_id).map(|c| c.name.as_str())
    }

    fn warn_on_dangling_references(&self) {
        for category in self.keywords.iter() {
            if self.fees.get(&category.id).is_none() {
                warn!(category_id = %category.id, "Category has no fee schedule row");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_loads() {
        let catalog = CatalogSet::embedded_default().unwrap();
        assert!(catalog.keywords.len() >= 10);
        assert!(catalog.keywords.get("31388").is_some());
        assert_eq!(catalog.bootstrap.for_category("31388").len(), 2);
        assert!(catalog.fees.get("31388").is_some());
        // Broad category is deliberately left without fee terms
        assert!(catalog.fees.get("293").is_none());
    }

    #[test]
    fn test_sections_optional() {
        let catalog = CatalogSet::from_toml_str(
            r#"
            [[categories]]
            id = "1"
            name = "Things"
            keywords = [{ term = "thing", weight = 1.0 }]
            "#,
        )
        .unwrap();
        assert_eq!(catalog.keywords.len(), 1);
        assert!(catalog.bootstrap.is_empty());
        assert!(catalog.fees.is_empty());
        assert_eq!(catalog.category_name("1"), Some("Things"));
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = CatalogSet::from_toml_str("[[categories]]\nid = 5").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            "[[fees]]\ncategory_id = \"9\"\nfinal_value_fee_percent = 10.0\n",
        )
        .unwrap();
        let catalog = CatalogSet::load_from_path(&path).unwrap();
        assert_eq!(catalog.fees.len(), 1);

        assert!(CatalogSet::load_from_path(&dir.path().join("missing.toml")).is_err());
    }
}
