//! Configuration types for the telemetry pipeline.
//!
//! These types represent the validated runtime configuration and can be
//! shared across crates. Loading and parsing a config file is handled by
//! the agent crate.

use std::collections::BTreeMap;
use std::time::Duration;

use beacon_sdk::objects::MAX_USER_PROPERTIES;
use thiserror::Error;
use url::Url;

use crate::buffer::{BufferPolicy, DEFAULT_BATCH_SIZE, DEFAULT_MAX_AGE};
use crate::processors::{DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT, DeliveryConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("measurement_id must not be empty")]
    MissingMeasurementId,

    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),

    #[error("endpoint scheme must be http or https, got {0:?}")]
    UnsupportedScheme(String),

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("max_batch_age must be greater than zero")]
    ZeroBatchAge,

    #[error("request_timeout must be greater than zero")]
    ZeroRequestTimeout,
}

/// Everything a [`Telemetry`](crate::telemetry::Telemetry) needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Data stream id, e.g. `G-XXXXXXX`.
    pub measurement_id: String,
    pub api_secret: Option<String>,
    pub endpoint: String,
    /// Overrides the identity provider as the client id source.
    pub client_id_seed: Option<String>,
    pub batch_size: usize,
    pub max_batch_age: Duration,
    pub request_timeout: Duration,
    pub non_personalized_ads: bool,
    pub user_properties: Option<BTreeMap<String, String>>,
}

impl TelemetryConfig {
    pub fn new(measurement_id: impl Into<String>) -> Self {
        Self {
            measurement_id: measurement_id.into(),
            api_secret: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client_id_seed: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_batch_age: DEFAULT_MAX_AGE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            non_personalized_ads: false,
            user_properties: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.measurement_id.trim().is_empty() {
            return Err(ConfigError::MissingMeasurementId);
        }
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(self.endpoint.clone()))?;
        match endpoint.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_batch_age.is_zero() {
            return Err(ConfigError::ZeroBatchAge);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        let property_count = self.user_properties.as_ref().map_or(0, BTreeMap::len);
        if property_count > MAX_USER_PROPERTIES {
            tracing::warn!(
                count = property_count,
                limit = MAX_USER_PROPERTIES,
                "More user properties than the collector accepts"
            );
        }
        Ok(())
    }

    pub fn buffer_policy(&self) -> BufferPolicy {
        BufferPolicy::new(self.batch_size, self.max_batch_age)
    }

    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            endpoint: self.endpoint.clone(),
            measurement_id: self.measurement_id.clone(),
            api_secret: self.api_secret.clone(),
            timeout: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::new("G-TEST");
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.max_batch_age, Duration::from_secs(86_400));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.endpoint, "https://www.google-analytics.com/mp/collect");
        assert!(!config.non_personalized_ads);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = TelemetryConfig::new("  ");
        assert_eq!(config.validate(), Err(ConfigError::MissingMeasurementId));

        let config = TelemetryConfig {
            endpoint: "collector".to_string(),
            ..TelemetryConfig::new("G-TEST")
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEndpoint(_))));

        let config = TelemetryConfig {
            endpoint: "ftp://collector.example/mp/collect".to_string(),
            ..TelemetryConfig::new("G-TEST")
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnsupportedScheme("ftp".to_string()))
        );

        let config = TelemetryConfig {
            endpoint: "http://127.0.0.1:8080/mp/collect".to_string(),
            ..TelemetryConfig::new("G-TEST")
        };
        assert!(config.validate().is_ok());

        let config = TelemetryConfig {
            batch_size: 0,
            ..TelemetryConfig::new("G-TEST")
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));

        let config = TelemetryConfig {
            max_batch_age: Duration::ZERO,
            ..TelemetryConfig::new("G-TEST")
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchAge));
    }

    #[test]
    fn test_derived_configs() {
        let config = TelemetryConfig {
            api_secret: Some("secret".to_string()),
            batch_size: 3,
            max_batch_age: Duration::from_secs(60),
            ..TelemetryConfig::new("G-TEST")
        };

        assert_eq!(
            config.buffer_policy(),
            BufferPolicy::new(3, Duration::from_secs(60))
        );
        let delivery = config.delivery_config();
        assert_eq!(delivery.measurement_id, "G-TEST");
        assert_eq!(delivery.api_secret.as_deref(), Some("secret"));
        assert_eq!(delivery.timeout, Duration::from_secs(30));
    }
}
