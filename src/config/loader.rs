use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Settings;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {source}")]
    ParseError {
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Settings {
    /// Returns the path to the configuration file.
    ///
    /// `unidirect/config.toml` under `dirs::config_dir()`, or the current
    /// directory if no config dir is known.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("unidirect").join("config.toml")
    }

    /// Loads settings from the default config file.
    ///
    /// Returns `Settings::default()` if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates settings from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| ConfigError::ParseError { source: e })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings.
    ///
    /// Checks:
    /// - The drain warning threshold is non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.drain_warning_threshold == 0 {
            return Err(ConfigError::ValidationError {
                message: "store.drain_warning_threshold must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
