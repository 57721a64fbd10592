//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `POIFINDER_*` environment
//! variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_CACHE_CAPACITY;

/// Crate configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `POIFINDER_*` overrides on top of
/// defaults. Search-flow tuning (tier radii, retry counts, location polling)
/// lives on [`SearchConfig`](crate::search::SearchConfig) instead; this type
/// covers storage, the remote-sync endpoint, and I/O timeouts.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for persisted cache/reliability/flag snapshots.
    /// Default: `./.data`.
    pub storage_path: PathBuf,

    /// Base URL of the crowd-aggregation API. `None` disables remote sync.
    pub sync_base_url: Option<String>,

    /// Per-query timeout for place-search provider calls. Default: 5 s.
    pub provider_timeout: Duration,

    /// Request timeout for remote-sync HTTP calls. Default: 10 s.
    pub sync_timeout: Duration,

    /// Maximum number of persisted cache entries. Default: 50.
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./.data"),
            sync_base_url: None,
            provider_timeout: Duration::from_secs(5),
            sync_timeout: Duration::from_secs(10),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Config {
    const ENV_STORAGE_PATH: &'static str = "POIFINDER_STORAGE_PATH";
    const ENV_SYNC_URL: &'static str = "POIFINDER_SYNC_URL";
    const ENV_PROVIDER_TIMEOUT_MS: &'static str = "POIFINDER_PROVIDER_TIMEOUT_MS";
    const ENV_SYNC_TIMEOUT_MS: &'static str = "POIFINDER_SYNC_TIMEOUT_MS";
    const ENV_CACHE_CAPACITY: &'static str = "POIFINDER_CACHE_CAPACITY";

    /// Loads configuration from environment variables (falling back to
    /// defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage_path = Self::parse_path_from_env(Self::ENV_STORAGE_PATH, defaults.storage_path);
        let sync_base_url = Self::parse_optional_string_from_env(Self::ENV_SYNC_URL);
        let provider_timeout = Self::parse_duration_ms_from_env(
            Self::ENV_PROVIDER_TIMEOUT_MS,
            defaults.provider_timeout,
        )?;
        let sync_timeout =
            Self::parse_duration_ms_from_env(Self::ENV_SYNC_TIMEOUT_MS, defaults.sync_timeout)?;
        let cache_capacity =
            Self::parse_usize_from_env(Self::ENV_CACHE_CAPACITY, defaults.cache_capacity);

        Ok(Self {
            storage_path,
            sync_base_url,
            provider_timeout,
            sync_timeout,
            cache_capacity,
        })
    }

    /// Validates paths and basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.exists() && !self.storage_path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.storage_path.clone(),
            });
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }

        if let Some(ref url) = self.sync_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidSyncUrl { value: url.clone() });
            }
        }

        Ok(())
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_duration_ms_from_env(
        var_name: &str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        match env::var(var_name) {
            Ok(value) => {
                let ms: u64 = value.parse().map_err(|e| ConfigError::InvalidDurationMs {
                    value: value.clone(),
                    source: e,
                })?;
                Ok(Duration::from_millis(ms))
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_usize_from_env(var_name: &str, default: usize) -> usize {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
