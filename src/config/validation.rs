//! Configuration validation utilities.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),

    /// Failed to read the host list.
    #[error("failed to read host list '{}': {source}", .path.display())]
    HostList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse duration string using humantime.
///
/// Supports various formats: `1s`, `500ms`, `1m30s`, `2h`, etc.
///
/// # Examples
///
/// ```
/// use pingwatch::config::parse_duration;
///
/// assert_eq!(parse_duration("1s").unwrap().as_secs(), 1);
/// assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Reject zero durations.
pub(crate) fn require_positive(name: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be positive"
        )));
    }
    Ok(())
}
