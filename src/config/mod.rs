//! Configuration module for pingwatch.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Probe settings (method, interval, timeout)
//! - Output directory and host list location
//! - Observer queue bound, display cadence, shutdown bound
//!
//! and loading of the plain-text host list.

mod app;
mod hosts;
mod validation;

pub use app::{AppConfig, DisplayConfig, ObserverConfig, ProbeConfig, ProbeMethod};
pub use hosts::{load_hosts, parse_hosts};
pub use validation::{ConfigError, parse_duration};

// Re-export constants
pub use app::{
    DEFAULT_DISPLAY_POLL_INTERVAL, DEFAULT_HOSTS_FILE, DEFAULT_OUTPUT_DIR, DEFAULT_PING_PROGRAM,
    DEFAULT_PROBE_TIMEOUT,
};
