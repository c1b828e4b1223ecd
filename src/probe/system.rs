//! Probe through the platform `ping` utility.

use std::process::{Command, Stdio};
use std::time::Duration;

use super::parser::parse;
use super::traits::{ProbeError, ProbeOutcome, Prober};

/// Default wait for a single echo reply (1 second).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Sends one echo request by running the system `ping` binary.
///
/// The exit status decides success; the captured stdout is handed to
/// [`parse`] for latency extraction.
#[derive(Debug, Clone)]
pub struct SystemPingProber {
    program: String,
    timeout: Duration,
}

impl SystemPingProber {
    /// Create a prober that waits at most `timeout` for each reply.
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ping".to_string(),
            timeout,
        }
    }

    /// Use a different executable (e.g. an absolute path to `ping`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Reply wait.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments for a single, bounded echo request.
    fn args(&self, host: &str) -> Vec<String> {
        let count = if cfg!(windows) { "-n" } else { "-c" };
        let mut args = vec![count.to_string(), "1".to_string()];

        if cfg!(windows) {
            args.extend(["-w".to_string(), self.timeout.as_millis().max(1).to_string()]);
        } else if cfg!(target_os = "macos") {
            // macOS takes the reply wait in milliseconds.
            args.extend(["-W".to_string(), self.timeout.as_millis().max(1).to_string()]);
        } else {
            let secs = self.timeout.as_secs_f64().ceil().max(1.0) as u64;
            args.extend(["-W".to_string(), secs.to_string()]);
        }

        args.push(host.to_string());
        args
    }
}

impl Default for SystemPingProber {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Prober for SystemPingProber {
    fn probe(&self, host: &str) -> Result<ProbeOutcome, ProbeError> {
        if host.is_empty() || host.starts_with('-') {
            tracing::warn!(host = %host, "Refusing to pass host to ping utility");
            return Ok(ProbeOutcome::failed(format!("invalid host: '{host}'")));
        }

        let output = Command::new(&self.program)
            .args(self.args(host))
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let succeeded = output.status.success();
        if !succeeded {
            tracing::debug!(
                host = %host,
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Ping utility reported failure"
            );
        }

        Ok(parse(&stdout, succeeded))
    }
}
