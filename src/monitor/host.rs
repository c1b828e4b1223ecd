//! Per-host probe loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use thiserror::Error;

use crate::monitor::ShutdownSignal;
use crate::observer::ObserverBus;
use crate::probe::{ProbeError, Prober};
use crate::record::Record;
use crate::sink::{LogHandle, SinkError};

/// Errors that end a single host monitor.
///
/// Failed probes are data, not errors; only these stop the loop. Sibling
/// monitors are never affected.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The probing mechanism could not be invoked.
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    /// The log file could not be opened or appended.
    #[error("log error: {0}")]
    Sink(#[from] SinkError),

    /// The monitor thread could not be started.
    #[error("failed to spawn monitor thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The monitor thread panicked.
    #[error("monitor panicked: {0}")]
    Panicked(String),
}

/// Final report a monitor sends to its supervisor.
#[derive(Debug)]
pub struct MonitorExit {
    /// Position of the host in the supervisor's host list.
    pub index: usize,
    pub host: String,
    pub result: Result<(), MonitorError>,
}

/// Lifecycle of a host monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MonitorState {
    Running = 0,
    Stopping = 1,
    Stopped = 2,
}

impl MonitorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Lock-free state shared between a monitor and its supervisor.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(MonitorState::Running as u8)))
    }

    pub(crate) fn get(&self) -> MonitorState {
        MonitorState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: MonitorState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// `Running` → `Stopping`; later states are left alone.
    pub(crate) fn begin_stopping(&self) {
        let _ = self.0.compare_exchange(
            MonitorState::Running as u8,
            MonitorState::Stopping as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// Supervisor-side control of one monitor.
#[derive(Debug)]
pub(crate) struct MonitorControl {
    state: StateCell,
    wake: Sender<()>,
}

impl MonitorControl {
    /// Ask the monitor to stop and cut its sleep short.
    ///
    /// An in-flight probe is left to finish.
    pub(crate) fn stop(&self) {
        self.state.begin_stopping();
        let _ = self.wake.send(());
    }

    pub(crate) fn state(&self) -> StateCell {
        self.state.clone()
    }
}

/// Repeating probe loop for one host.
///
/// Each cycle: capture `sent_at`, probe, capture `received_at`, append the
/// record to the host's log, publish it to observers, then sleep for the
/// interval. The stop request and the shared [`ShutdownSignal`] are checked
/// between cycles.
pub struct HostMonitor {
    index: usize,
    host: String,
    log: LogHandle,
    bus: Arc<ObserverBus>,
    prober: Arc<dyn Prober>,
    interval: Duration,
    shutdown: ShutdownSignal,
    state: StateCell,
    wake: Receiver<()>,
}

impl std::fmt::Debug for HostMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostMonitor")
            .field("index", &self.index)
            .field("host", &self.host)
            .field("log", &self.log.path())
            .field("interval", &self.interval)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl HostMonitor {
    /// Create a monitor in the `Running` state together with its control.
    pub(crate) fn new(
        index: usize,
        host: impl Into<String>,
        log: LogHandle,
        bus: Arc<ObserverBus>,
        prober: Arc<dyn Prober>,
        interval: Duration,
        shutdown: ShutdownSignal,
    ) -> (Self, MonitorControl) {
        let (wake_tx, wake_rx) = mpsc::channel();
        let state = StateCell::new();

        let monitor = Self {
            index,
            host: host.into(),
            log,
            bus,
            prober,
            interval,
            shutdown,
            state: state.clone(),
            wake: wake_rx,
        };
        let control = MonitorControl {
            state,
            wake: wake_tx,
        };
        (monitor, control)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> MonitorState {
        self.state.get()
    }

    /// Run the loop on a dedicated thread. The exit report goes to `exits`.
    pub(crate) fn spawn(self, exits: Sender<MonitorExit>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("monitor-{}", self.index))
            .spawn(move || self.run(exits))
    }

    fn run(mut self, exits: Sender<MonitorExit>) {
        tracing::info!(host = %self.host, interval = ?self.interval, "Host monitor started");

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop()))
            .unwrap_or_else(|payload| Err(MonitorError::Panicked(panic_message(&*payload))));

        match &result {
            Ok(()) => tracing::info!(
                host = %self.host,
                records = self.log.appended(),
                "Host monitor stopped"
            ),
            Err(e) => tracing::error!(host = %self.host, error = %e, "Host monitor failed"),
        }

        let Self {
            index,
            host,
            log,
            state,
            ..
        } = self;
        state.begin_stopping();
        drop(log);
        state.set(MonitorState::Stopped);

        let _ = exits.send(MonitorExit {
            index,
            host,
            result,
        });
    }

    fn run_loop(&mut self) -> Result<(), MonitorError> {
        while !self.should_stop() {
            self.cycle()?;

            match self.wake.recv_timeout(self.interval) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.state.begin_stopping(),
            }
        }
        Ok(())
    }

    /// One probe, logged and published.
    fn cycle(&mut self) -> Result<(), MonitorError> {
        let sent_at = Local::now();
        let outcome = self.prober.probe(&self.host)?;
        let received_at = Local::now();

        if !outcome.success {
            tracing::debug!(host = %self.host, "Probe failed");
        }

        let record = Record::new(self.host.clone(), sent_at, received_at, outcome);
        self.log.append(&record)?;
        self.bus.publish(record);
        Ok(())
    }

    fn should_stop(&self) -> bool {
        if self.shutdown.is_triggered() {
            self.state.begin_stopping();
        }
        self.state.get() != MonitorState::Running
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
