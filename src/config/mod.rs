//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::calculate::RatingModel;
use crate::storage::StorageConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the `<date>/<map>.json` tree.
    #[serde(default = "default_matches_dir")]
    pub matches_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Series shown on the landing page. Defaults to the latest date key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_date: Option<String>,

    /// How many agents each career summary lists.
    #[serde(default = "default_top_agents")]
    pub top_agents: usize,

    #[serde(default)]
    pub rating: RatingModel,
}

fn default_matches_dir() -> PathBuf {
    PathBuf::from("./matches")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_agents() -> usize {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matches_dir: default_matches_dir(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
            featured_date: None,
            top_agents: default_top_agents(),
            rating: RatingModel::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_agents == 0 {
            return Err(ConfigError::ValidationError(
                "top_agents must be greater than 0".to_string(),
            ));
        }

        if let Some(date) = &self.featured_date {
            if date.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "featured_date must not be empty".to_string(),
                ));
            }
        }

        self.rating.validate().map_err(ConfigError::ValidationError)
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(self.matches_dir.clone(), self.output_dir.clone())
    }
}
