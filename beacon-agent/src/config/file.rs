//! TOML file configuration structures.
//!
//! These structs directly map to the `beacon.toml` file format.

use beacon_core::buffer::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_AGE};
use beacon_core::processors::{DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub payload: PayloadConfig,
}

/// Collector endpoint and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Data stream id, e.g. `G-XXXXXXX`. May be empty here and supplied on
    /// the command line instead.
    #[serde(default)]
    pub measurement_id: String,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_age_secs() -> u64 {
    DEFAULT_MAX_AGE.as_secs()
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Use this instead of the stored install id.
    #[serde(default)]
    pub client_id_seed: Option<String>,
    /// Where the install id is kept between runs.
    #[serde(default = "default_id_file")]
    pub id_file: PathBuf,
}

fn default_id_file() -> PathBuf {
    PathBuf::from("./.beacon/install_id")
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_id_seed: None,
            id_file: default_id_file(),
        }
    }
}

/// Host properties reported with page views.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub screen_resolution: Option<String>,
    /// Overrides the language taken from `LC_ALL` / `LANG`.
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadConfig {
    #[serde(default)]
    pub non_personalized_ads: bool,
    #[serde(default)]
    pub user_properties: Option<BTreeMap<String, String>>,
}
