//! Configuration resolution for resale-classifier
//!
//! Startup settings resolve with CLI → ENV → TOML → compiled default
//! priority. Runtime tuning lives in the settings table instead
//! (see `db::parameters`).

use resale_common::config::TomlConfig;
use resale_common::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::CatalogSet;
use crate::models::PaymentFeeSettings;

/// Module name used for the TOML file (`~/.config/resale/classifier.toml`)
pub const MODULE_NAME: &str = "classifier";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5740";

pub const ENV_FEE_SERVICE_URL: &str = "RESALE_FEE_SERVICE_URL";

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub fee_service_url: Option<String>,
}

/// Fully resolved startup configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_address: String,
    /// `None` selects the embedded default catalog
    pub catalog_path: Option<PathBuf>,
    pub fee_service_url: Option<String>,
    pub payment: PaymentFeeSettings,
}

impl ServiceConfig {
    /// Merge CLI, environment and TOML sources
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let env_fee_url = std::env::var(ENV_FEE_SERVICE_URL).ok();
        Self::resolve_with_env(cli, toml_config, env_fee_url)
    }

    fn resolve_with_env(
        cli: &CliOverrides,
        toml_config: &TomlConfig,
        env_fee_url: Option<String>,
    ) -> Result<Self> {
        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| toml_config.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let catalog_path = cli
            .catalog_path
            .clone()
            .or_else(|| toml_config.catalog_path.clone());

        let fee_service_url = [
            cli.fee_service_url.clone(),
            env_fee_url,
            toml_config.fee_service_url.clone(),
        ]
        .into_iter()
        .flatten()
        .map(|url| url.trim().to_string())
        .find(|url| !url.is_empty());

        if let Some(url) = &fee_service_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "fee_service_url must be an http(s) URL, got {}",
                    url
                )));
            }
        }

        let defaults = PaymentFeeSettings::default();
        let payment = PaymentFeeSettings {
            percent: toml_config.payment_fee_percent.unwrap_or(defaults.percent),
            fixed_minor_units: toml_config
                .payment_fixed_fee_minor_units
                .unwrap_or(defaults.fixed_minor_units),
        };
        if !payment.percent.is_finite() || payment.percent < 0.0 {
            return Err(Error::Config(format!(
                "payment_fee_percent must be a non-negative number, got {}",
                payment.percent
            )));
        }
        if payment.fixed_minor_units < 0 {
            warn!(
                "payment_fixed_fee_minor_units is negative ({}), using 0",
                payment.fixed_minor_units
            );
        }

        Ok(Self {
            bind_address,
            catalog_path,
            fee_service_url,
            payment: PaymentFeeSettings {
                fixed_minor_units: payment.fixed_minor_units.max(0),
                ..payment
            },
        })
    }

    /// Load the configured catalog, or the embedded one
    pub fn load_catalog(&self) -> Result<Arc<CatalogSet>> {
        let catalog = match &self.catalog_path {
            Some(path) => {
                info!("Loading catalog from {}", path.display());
                CatalogSet::load_from_path(path)?
            }
            None => {
                info!("Using embedded default catalog");
                CatalogSet::embedded_default()?
            }
        };
        Ok(Arc::new(catalog))
    }
}
