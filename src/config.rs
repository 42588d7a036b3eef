//! # Configuration
//!
//! Explicit, validated configuration for the three runtime components. All
//! values have shippable defaults; a YAML file can override any of them, and
//! the loader auto-detects the environment the same way it names the file
//! (`config/studyforge/{environment}.yaml`). No silent fallbacks: a present
//! but unreadable or invalid file is an error.

use crate::constants::defaults;
use crate::resilience::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to read config file {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Rate limiter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum operation dispatches started per second
    pub calls_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls_per_second: defaults::CALLS_PER_SECOND,
        }
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Namespace prefix for durable keys this cache owns
    pub namespace: String,
    /// Default entry time-to-live in milliseconds
    pub default_ttl_ms: u64,
    /// Optional byte budget for the durable tier
    pub max_durable_bytes: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace: defaults::CACHE_NAMESPACE.to_string(),
            default_ttl_ms: defaults::CACHE_TTL_MS,
            max_durable_bytes: None,
        }
    }
}

/// Top-level configuration for the resilience and caching components
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheSettings,
}

impl CoreConfig {
    /// Load configuration for the auto-detected environment.
    ///
    /// Looks for `config/studyforge/{environment}.yaml` relative to the
    /// working directory; a missing file yields the defaults, anything else
    /// is loaded and validated.
    pub fn load() -> Result<Self, ConfigurationError> {
        let environment = detect_environment();
        let path = PathBuf::from("config/studyforge").join(format!("{environment}.yaml"));
        if !path.exists() {
            debug!(environment, "No config file found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from_file(&path)
    }

    /// Load and validate configuration from an explicit YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigurationError::FileRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: CoreConfig =
            serde_yaml::from_str(&raw).map_err(|e| ConfigurationError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Reject configurations that cannot behave sensibly at runtime.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.rate_limit.calls_per_second == 0 {
            return Err(ConfigurationError::Invalid(
                "rate_limit.calls_per_second must be greater than zero".into(),
            ));
        }
        if self.retry.backoff_factor < 1.0 {
            return Err(ConfigurationError::Invalid(
                "retry.backoff_factor must be at least 1.0".into(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigurationError::Invalid(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        if self.cache.namespace.is_empty() {
            return Err(ConfigurationError::Invalid(
                "cache.namespace must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Environment name from `STUDYFORGE_ENV`, falling back to `development`.
pub fn detect_environment() -> String {
    env::var("STUDYFORGE_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}
