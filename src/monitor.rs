//! Monitor Layer
//!
//! One [`HostMonitor`] per configured host, each on its own thread, probing
//! on a fixed interval. The [`Supervisor`] owns the set of monitors, starts
//! them under one shared session and stops them with a bounded wait.
//!
//! # Architecture
//!
//! - [`HostMonitor`]: Probe, timestamp, log, publish, sleep, repeat
//! - [`MonitorState`]: `Running` → `Stopping` → `Stopped`
//! - [`ShutdownSignal`]: Process-wide cooperative stop flag
//! - [`Supervisor`]: Startup, per-host and coordinated shutdown, exit reports

mod host;
mod shutdown;
mod supervisor;

pub use host::{HostMonitor, MonitorError, MonitorExit, MonitorState};
pub use shutdown::ShutdownSignal;
pub use supervisor::{
    DEFAULT_PROBE_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT, ShutdownReport, Supervisor,
    SupervisorSettings,
};
