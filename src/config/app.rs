//! Main application configuration
//!
//! This module defines the configuration structures for the ledger
//! application, including environment variable loading, optional TOML file
//! override, and validation.

use crate::error::Result;
use crate::rating::RatingWeights;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub rating: RatingWeights,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the four JSON collections
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            storage: StorageSettings::default(),
            rating: RatingWeights::default(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "paddock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(log_level) = env::var("PADDOCK_LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        if let Ok(data_dir) = env::var("PADDOCK_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&contents)?;

        if let Ok(log_level) = env::var("PADDOCK_LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(data_dir) = env::var("PADDOCK_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.name.is_empty() {
            anyhow::bail!("Service name cannot be empty");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.service.log_level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.service.log_level);
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            anyhow::bail!("Data directory cannot be empty");
        }

        self.rating.validate()
    }
}
