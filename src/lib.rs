//! pingwatch - Per-Host Latency Logger
//!
//! Probes a list of hosts with one ICMP echo request per second each,
//! appends every result to a per-host session log and streams results to
//! live observers without ever blocking the probe loops.
//!
//! # Architecture
//!
//! - **Probe**: One echo request per call, system `ping` or raw ICMP
//! - **Record**: Timestamped outcome and its log line format
//! - **Sink**: Append-only `<host>_<session>.log` files
//! - **Observer**: Non-blocking per-host fan-out to displays
//! - **Monitor**: One thread per host, owned by a [`Supervisor`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pingwatch::{LogSink, Supervisor, SupervisorSettings, SystemPingProber};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = LogSink::create("output")?;
//! let prober = Arc::new(SystemPingProber::default());
//! let mut supervisor = Supervisor::new(sink, prober, SupervisorSettings::default());
//!
//! let session = supervisor.start(&["8.8.8.8".to_string(), "1.1.1.1".to_string()]);
//! let subscription = supervisor.subscribe(0).expect("monitor 0");
//! if let Some(record) = subscription.try_consume() {
//!     println!("{}", record.summary());
//! }
//!
//! let report = supervisor.stop_all();
//! println!("session {session}: {} monitors stopped", report.stopped);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod display;
pub mod monitor;
pub mod observer;
pub mod probe;
pub mod record;
pub mod sink;

pub use config::{AppConfig, ConfigError, ProbeMethod};
pub use display::{ConsoleDisplay, spawn_stop_input, watch_stop_input};
pub use monitor::{
    HostMonitor, MonitorError, MonitorExit, MonitorState, ShutdownReport, ShutdownSignal,
    Supervisor, SupervisorSettings,
};
pub use observer::{ObserverBus, Subscription};
pub use probe::{IcmpProber, Latency, ProbeError, ProbeOutcome, Prober, SystemPingProber, parse};
pub use record::{Record, Session};
pub use sink::{LogHandle, LogSink, SinkError};
