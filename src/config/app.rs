//! Application configuration structures.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::{DEFAULT_PROBE_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT, SupervisorSettings};
use crate::probe::{IcmpProber, ProbeError, Prober, SystemPingProber};

use super::validation::{ConfigError, require_positive};

// =============================================================================
// Constants
// =============================================================================

/// Default host list location.
pub const DEFAULT_HOSTS_FILE: &str = "config/ips.txt";

/// Default directory for per-host log files.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default reply wait for a single probe (1 second).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default `ping` executable for the system method, looked up on `PATH`.
pub const DEFAULT_PING_PROGRAM: &str = "ping";

/// Default console display polling cadence (100 milliseconds).
pub const DEFAULT_DISPLAY_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn default_interval() -> Duration {
    DEFAULT_PROBE_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

fn default_program() -> String {
    DEFAULT_PING_PROGRAM.to_string()
}

fn default_poll_interval() -> Duration {
    DEFAULT_DISPLAY_POLL_INTERVAL
}

fn default_shutdown_timeout() -> Duration {
    DEFAULT_SHUTDOWN_TIMEOUT
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// How echo requests are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// Run the platform `ping` utility.
    #[default]
    System,
    /// Send ICMP directly (needs raw or datagram ICMP socket permission).
    Icmp,
}

/// Probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probing mechanism (default: system).
    #[serde(default)]
    pub method: ProbeMethod,

    /// Delay between probes of one host (default: 1s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Reply wait per probe (default: 1s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// `ping` executable used by the system method (default: ping).
    #[serde(default = "default_program")]
    pub program: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            method: ProbeMethod::default(),
            interval: DEFAULT_PROBE_INTERVAL,
            timeout: DEFAULT_PROBE_TIMEOUT,
            program: default_program(),
        }
    }
}

impl ProbeConfig {
    /// Build the configured prober.
    ///
    /// # Errors
    /// The ICMP prober needs a running tokio runtime.
    pub fn build_prober(&self) -> Result<Arc<dyn Prober>, ProbeError> {
        Ok(match self.method {
            ProbeMethod::System => {
                Arc::new(SystemPingProber::new(self.timeout).with_program(&self.program))
            }
            ProbeMethod::Icmp => Arc::new(IcmpProber::from_current(self.timeout)?),
        })
    }
}

// =============================================================================
// Observer / Display Configuration
// =============================================================================

/// Observer queue settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Per-subscriber queue bound. Unbounded when absent.
    #[serde(default)]
    pub capacity: Option<usize>,
}

/// Console display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show records on stdout (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often queued records are drained (default: 100ms).
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

fn default_enabled() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: DEFAULT_DISPLAY_POLL_INTERVAL,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host list file, one host per line.
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,

    /// Directory for `<host>_<session>.log` files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub observer: ObserverConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    /// Upper bound on the coordinated shutdown wait (default: 5s).
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from(DEFAULT_HOSTS_FILE)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hosts_file: default_hosts_file(),
            output_dir: default_output_dir(),
            probe: ProbeConfig::default(),
            observer: ObserverConfig::default(),
            display: DisplayConfig::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("probe interval", self.probe.interval)?;
        require_positive("probe timeout", self.probe.timeout)?;
        require_positive("display poll_interval", self.display.poll_interval)?;
        require_positive("shutdown_timeout", self.shutdown_timeout)?;

        if self.observer.capacity == Some(0) {
            return Err(ConfigError::ValidationError(
                "observer capacity must be positive".to_string(),
            ));
        }

        if self.probe.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "probe program must not be empty".to_string(),
            ));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "output_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Supervisor settings derived from this configuration.
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings::default()
            .with_interval(self.probe.interval)
            .with_shutdown_timeout(self.shutdown_timeout)
            .with_observer_capacity(self.observer.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.hosts_file, PathBuf::from("config/ips.txt"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.probe.method, ProbeMethod::System);
        assert_eq!(config.probe.interval, Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.observer.capacity, None);
        assert!(config.display.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
hosts_file: /etc/pingwatch/hosts.txt
output_dir: /var/log/pingwatch
probe:
  method: icmp
  interval: 2s
  timeout: 500ms
  program: /usr/local/bin/ping
observer:
  capacity: 64
display:
  enabled: false
  poll_interval: 250ms
shutdown_timeout: 3s
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.hosts_file, PathBuf::from("/etc/pingwatch/hosts.txt"));
        assert_eq!(config.probe.method, ProbeMethod::Icmp);
        assert_eq!(config.probe.interval, Duration::from_secs(2));
        assert_eq!(config.probe.timeout, Duration::from_millis(500));
        assert_eq!(config.probe.program, "/usr/local/bin/ping");
        assert_eq!(config.observer.capacity, Some(64));
        assert!(!config.display.enabled);
        assert_eq!(config.display.poll_interval, Duration::from_millis(250));

        let settings = config.supervisor_settings();
        assert_eq!(settings.interval, Duration::from_secs(2));
        assert_eq!(settings.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(settings.observer_capacity, Some(64));
    }

    #[test]
    fn test_from_yaml_partial_uses_defaults() {
        let config = AppConfig::from_yaml("output_dir: logs\n").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("logs"));
        assert_eq!(config.hosts_file, PathBuf::from(DEFAULT_HOSTS_FILE));
        assert_eq!(config.probe.timeout, DEFAULT_PROBE_TIMEOUT);
        assert_eq!(config.probe.program, DEFAULT_PING_PROGRAM);
    }

    #[test]
    fn test_validation_rejects_empty_program() {
        let result = AppConfig::from_yaml("probe:\n  program: \"  \"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let result = AppConfig::from_yaml("probe:\n  interval: 0s\n");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("probe interval must be positive")
        );
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = AppConfig::default();
        config.observer.capacity = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = AppConfig::from_yaml("probe: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_build_system_prober() {
        let config = ProbeConfig::default();
        assert!(config.build_prober().is_ok());
    }
}
