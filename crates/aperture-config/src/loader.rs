//! Loading and validating the configuration file.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Load configuration from `path`.
///
/// A missing file is not an error: the daemon starts with every section at its
/// [`Default`], matching the spec's requirement that a bare file produces a
/// working daemon.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file exists but cannot be read,
/// [`ConfigError::Parse`] if its TOML is malformed, or [`ConfigError::Invalid`]
/// if the merged configuration fails [`validate`].
pub fn load(path: &Path) -> ConfigResult<Config> {
    if !path.exists() {
        warn!(path = %path.display(), "config file not found, using built-in defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(&config)?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Semantic validation beyond what types alone capture.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first rule that failed.
pub fn validate(config: &Config) -> ConfigResult<()> {
    let t = &config.thresholds;

    if !(0.0..=1.0).contains(&t.variety_low_watermark) {
        return Err(ConfigError::Invalid(
            "thresholds.variety_low_watermark must be in [0, 1]".to_string(),
        ));
    }
    if t.variety_sustained_samples == 0 {
        return Err(ConfigError::Invalid(
            "thresholds.variety_sustained_samples must be at least 1".to_string(),
        ));
    }
    if t.breaker_failure_threshold == 0 || t.breaker_success_threshold == 0 {
        return Err(ConfigError::Invalid(
            "breaker thresholds must be at least 1".to_string(),
        ));
    }
    if t.retry_max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "thresholds.retry_max_attempts must be at least 1".to_string(),
        ));
    }
    if t.retry_backoff_factor < 1.0 {
        return Err(ConfigError::Invalid(
            "thresholds.retry_backoff_factor must be >= 1.0".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&t.retry_jitter) {
        return Err(ConfigError::Invalid(
            "thresholds.retry_jitter must be in [0, 1]".to_string(),
        ));
    }

    let limits = &config.limits;
    if limits.max_children == 0 {
        return Err(ConfigError::Invalid(
            "limits.max_children must be at least 1".to_string(),
        ));
    }
    if limits.dlq_capacity == 0 {
        return Err(ConfigError::Invalid(
            "limits.dlq_capacity must be at least 1".to_string(),
        ));
    }

    for name in &config.policies.package_whitelist {
        if config.policies.dangerous_name_blacklist.contains(name) {
            return Err(ConfigError::Invalid(format!(
                "package '{name}' is both whitelisted and blacklisted"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Path::new("/nonexistent/does-not-exist.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not [ valid toml").unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn out_of_range_watermark_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds]\nvariety_low_watermark = 4.2").unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_children = 8").unwrap();
        let config = load(file.path()).unwrap();
        assert_eq!(config.limits.max_children, 8);
        assert_eq!(config.limits.dlq_capacity, Config::default().limits.dlq_capacity);
    }
}
