//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`RESALE_ROOT_FOLDER`, then `RESALE_ROOT`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops a service from starting:
//! it logs a warning and falls back to compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ENV_ROOT_FOLDER: &str = "RESALE_ROOT_FOLDER";

/// Alternative root folder environment variable
pub const ENV_ROOT: &str = "RESALE_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "resale.db";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive (e.g. "info", "resale_classifier=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file path (stdout when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Per-module TOML configuration file
///
/// Every field is optional so that older or hand-trimmed files keep loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Listen address, e.g. "127.0.0.1:5740"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Category catalog TOML (keywords, bootstrap table, fee schedule)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Base URL of a remote fee schedule service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_service_url: Option<String>,

    /// Payment processing fee, percent of sale price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_fee_percent: Option<f64>,

    /// Fixed payment processing fee per order, minor units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_fixed_fee_minor_units: Option<i64>,
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/resale (or /var/lib/resale for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("resale"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/resale"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("resale"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/resale"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("resale"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\resale"))
    } else {
        PathBuf::from("./resale_data")
    }
}

/// Resolves the root folder for one module
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_override: None,
        }
    }

    /// Command-line value, highest priority when present
    pub fn with_cli_override(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    /// Path of this module's TOML config file, whether or not it exists
    pub fn config_file_path(&self) -> Option<PathBuf> {
        let file_name = format!("{}.toml", self.module_name);
        let user_config = dirs::config_dir().map(|d| d.join("resale").join(&file_name));

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/resale").join(&file_name);
            match user_config {
                Some(path) if path.exists() => Some(path),
                _ if system_config.exists() => Some(system_config),
                other => other,
            }
        } else {
            user_config
        }
    }

    /// Load the module TOML config, falling back to defaults
    pub fn load_toml(&self) -> TomlConfig {
        match self.config_file_path() {
            Some(path) if path.exists() => match load_toml_config(&path) {
                Ok(config) => {
                    debug!("Loaded config file: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    TomlConfig::default()
                }
            },
            _ => TomlConfig::default(),
        }
    }

    /// Resolve the root folder following the documented priority order
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_override {
            return path.clone();
        }

        for var in [ENV_ROOT_FOLDER, ENV_ROOT] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(root) = self.load_toml().root_folder {
            return root;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates the database inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder (and parents) if missing; idempotent
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write a TOML config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    // Write to a sibling temp file and rename so readers never see a partial file
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
