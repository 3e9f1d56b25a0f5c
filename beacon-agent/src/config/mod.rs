//! Configuration module for beacon-agent.
//!
//! Handles loading configuration from the TOML file and applying
//! command line overrides.

pub mod file;

use crate::config::file::FileConfig;
use beacon_core::TelemetryConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(#[from] beacon_core::ConfigError),
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub measurement_id: Option<String>,
    pub batch_size: Option<usize>,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub telemetry: TelemetryConfig,
    pub id_file: PathBuf,
    pub screen_resolution: Option<String>,
    pub language: Option<String>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    overrides: CliOverrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, overrides: CliOverrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.parse(&config_content)
    }

    /// Steps 2 and 3 of [`load`](Self::load), for an already read file.
    pub fn parse(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(measurement_id) = &self.overrides.measurement_id {
            file_config.collector.measurement_id = measurement_id.clone();
        }
        if let Some(batch_size) = self.overrides.batch_size {
            file_config.batching.batch_size = batch_size;
        }

        let loaded = build_loaded_config(file_config);
        loaded.telemetry.validate()?;
        Ok(loaded)
    }
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    let telemetry = TelemetryConfig {
        measurement_id: file_config.collector.measurement_id,
        api_secret: file_config.collector.api_secret,
        endpoint: file_config.collector.endpoint,
        client_id_seed: file_config.identity.client_id_seed,
        batch_size: file_config.batching.batch_size,
        max_batch_age: Duration::from_secs(file_config.batching.max_age_secs),
        request_timeout: Duration::from_secs(file_config.collector.timeout_secs),
        non_personalized_ads: file_config.payload.non_personalized_ads,
        user_properties: file_config.payload.user_properties,
    };

    LoadedConfig {
        telemetry,
        id_file: file_config.identity.id_file,
        screen_resolution: file_config.system.screen_resolution,
        language: file_config.system.language,
    }
}
