//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A millisecond duration could not be parsed as a number.
    #[error("failed to parse '{value}' as milliseconds: {source}")]
    InvalidDurationMs {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A cache capacity of zero would make every search miss.
    #[error("cache capacity must be at least 1")]
    ZeroCacheCapacity,

    /// The sync base URL is not an http(s) URL.
    #[error("invalid sync base URL '{value}': expected http:// or https://")]
    InvalidSyncUrl { value: String },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
