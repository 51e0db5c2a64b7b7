//! Cache and lister configuration.
//!
//! Values are read once, when the [`Session`](crate::session::Session) is built. Changing the
//! configuration requires building a new session.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Value meaning "no limit" for the node budget and the access ceiling.
pub const UNLIMITED: i64 = -1;

fn default_ttl_ms() -> u64 {
    60_000
}

fn default_unlimited() -> i64 {
    UNLIMITED
}

fn default_concurrency() -> usize {
    20
}

/// Directory-listing cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// How long a cached listing stays valid, in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Maximum number of cached children across all listings. Negative means unlimited.
    #[serde(default = "default_unlimited")]
    pub max_entries: i64,

    /// Maximum number of reads served by one listing. Negative means unlimited, zero disables
    /// caching (every listing is served exactly once).
    #[serde(default = "default_unlimited")]
    pub max_access: i64,
}

impl CacheConfig {
    /// The listing TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            max_entries: UNLIMITED,
            max_access: UNLIMITED,
        }
    }
}

/// Metadata lister configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListerConfig {
    /// Number of workers, which is also the task queue capacity.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ListerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Top-level configuration for the caching core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Listing cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Lister settings.
    #[serde(default)]
    pub lister: ListerConfig,
}

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration parsed but is not usable.
    #[error("Configuration validation errors: {0:?}")]
    ValidationErrors(Vec<String>),

    /// The configuration file is not valid TOML for [`Config`].
    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    ///
    /// Returns every problem found, not just the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.lister.concurrency == 0 {
            errors.push("lister.concurrency must be at least 1.".to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(ConfigError::ValidationErrors)?;
        Ok(config)
    }

    /// Loads and validates a configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
