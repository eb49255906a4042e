//! Configuration error types.

use std::path::PathBuf;

/// Errors produced while loading or watching configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file's TOML could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged configuration failed a semantic validation rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The filesystem watcher could not be started.
    #[error("failed to watch config file for changes: {0}")]
    Watch(#[from] notify::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
