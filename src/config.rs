use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::AnalysisSettings;
use crate::error::AeroRsError;
use crate::logging::LogConfig;
use crate::models::PhysicalConstants;
use crate::power::NormalizedPowerConfig;
use crate::regression::RegressionConfig;

/// Current configuration format version
pub const CONFIG_VERSION: &str = "1.0";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Physical constants and speed unit policy
    #[serde(default)]
    pub constants: PhysicalConstants,

    /// CdA regression filters and clamp band
    #[serde(default)]
    pub regression: RegressionConfig,

    /// Normalized Power window
    #[serde(default)]
    pub normalized_power: NormalizedPowerConfig,

    /// Pipeline switches
    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: CONFIG_VERSION.to_string(),
                created_at: now,
                updated_at: now,
            },
            constants: PhysicalConstants::default(),
            regression: RegressionConfig::default(),
            normalized_power: NormalizedPowerConfig::default(),
            analysis: AnalysisSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aerors")
            .join("config.toml")
    }

    /// Load configuration from the default path, falling back to defaults
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::default_config_path())
    }

    /// Load `config_path` if it exists and is valid, otherwise use defaults.
    /// Problems go to stderr since logging is configured from the result.
    pub fn load_or_default_from(config_path: &Path) -> Self {
        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Ignoring unusable config file {}: {:#}",
                    config_path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save configuration to the default location
    pub fn save_default(&mut self) -> Result<PathBuf> {
        let config_path = Self::default_config_path();
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// Check every section for physically meaningless values
    pub fn validate(&self) -> crate::error::Result<()> {
        let section = |name: &str, check: std::result::Result<(), String>| {
            check.map_err(|reason| AeroRsError::Configuration(format!("[{}] {}", name, reason)))
        };

        section("constants", self.constants.validate())?;
        section("regression", self.regression.validate())?;
        section("normalized_power", self.normalized_power.validate())?;
        Ok(())
    }
}
