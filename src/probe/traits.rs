//! Core probe traits and types.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors that prevent a probe from being attempted at all.
///
/// Network-level failures (timeout, unreachable, unknown host) are never
/// reported through this type.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The system ping utility could not be started.
    #[error("failed to invoke ping utility: {0}")]
    Spawn(#[from] std::io::Error),

    /// An ICMP socket could not be opened.
    #[error("failed to create ICMP client: {0}")]
    Socket(#[source] std::io::Error),

    /// The probing mechanism is not usable in this context.
    #[error("prober unavailable: {0}")]
    Unavailable(String),
}

/// Round-trip latency as reported by the probe, in milliseconds.
///
/// Kept as text so that bound values such as `<1` survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Latency {
    /// `time=<value>ms`
    Exact(String),
    /// `time<<value>ms`: the probe only reported an upper bound.
    UpperBound(String),
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => f.write_str(value),
            Self::UpperBound(value) => write!(f, "<{value}"),
        }
    }
}

/// Result of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Whether the echo reply came back.
    pub success: bool,
    /// Latency, if the probe succeeded and reported one.
    pub latency: Option<Latency>,
    /// Unprocessed output of the probing mechanism.
    pub raw_output: String,
}

impl ProbeOutcome {
    /// A failed outcome carrying the given diagnostic output.
    pub fn failed(raw_output: impl Into<String>) -> Self {
        Self {
            success: false,
            latency: None,
            raw_output: raw_output.into(),
        }
    }

    /// Latency rendered as text (`"12.3"`, `"<1"`), if known.
    pub fn latency_millis(&self) -> Option<String> {
        self.latency.as_ref().map(ToString::to_string)
    }
}

/// Issues a single echo request to a host and waits for its outcome.
///
/// Implementations block the calling thread until the reply arrives or the
/// mechanism's own timeout elapses. They must be callable concurrently from
/// several monitor threads.
pub trait Prober: Send + Sync + 'static {
    /// Probe `host` once.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] only when the probe cannot be issued at all.
    fn probe(&self, host: &str) -> Result<ProbeOutcome, ProbeError>;
}

impl<P: Prober + ?Sized> Prober for Arc<P> {
    fn probe(&self, host: &str) -> Result<ProbeOutcome, ProbeError> {
        (**self).probe(host)
    }
}
