//! Supervisor for managing host monitor lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::monitor::ShutdownSignal;
use crate::monitor::host::{
    HostMonitor, MonitorControl, MonitorError, MonitorExit, MonitorState, StateCell,
};
use crate::observer::{ObserverBus, Subscription};
use crate::probe::Prober;
use crate::record::Session;
use crate::sink::LogSink;

/// Default delay between two probes of the same host (1 second).
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Default upper bound for [`Supervisor::stop_all`] (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by every monitor a supervisor starts.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Delay between probes.
    pub interval: Duration,
    /// Upper bound on the wait in [`Supervisor::stop_all`].
    pub shutdown_timeout: Duration,
    /// Per-subscriber queue bound; `None` for unbounded.
    pub observer_capacity: Option<usize>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROBE_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            observer_capacity: None,
        }
    }
}

impl SupervisorSettings {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_observer_capacity(mut self, capacity: Option<usize>) -> Self {
        self.observer_capacity = capacity;
        self
    }
}

/// Outcome of a coordinated shutdown.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Monitors that stopped without error.
    pub stopped: usize,
    /// Monitors that ended with an error, including earlier failures.
    pub failed: Vec<MonitorExit>,
    /// Hosts whose monitors did not stop within the bound.
    pub unresponsive: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unresponsive.is_empty()
    }
}

/// Supervisor-side record of one monitor.
struct MonitorSlot {
    index: usize,
    host: String,
    log_path: PathBuf,
    bus: Arc<ObserverBus>,
    state: StateCell,
    control: Option<MonitorControl>,
    /// Prepared but not yet spawned.
    pending: Option<HostMonitor>,
    thread: Option<JoinHandle<()>>,
}

/// Owns the host monitors of one run.
///
/// Monitors are indexed by their position in the host list passed to
/// [`Supervisor::start`]. Duplicate hosts get independent monitors.
///
/// `start` is [`Supervisor::prepare`] followed by [`Supervisor::launch`].
/// Observers that must not miss a single record subscribe in between.
pub struct Supervisor {
    sink: LogSink,
    prober: Arc<dyn Prober>,
    settings: SupervisorSettings,
    shutdown: ShutdownSignal,
    session: Option<Session>,
    slots: Vec<MonitorSlot>,
    exits_tx: Sender<MonitorExit>,
    exits_rx: Receiver<MonitorExit>,
    failures: Vec<MonitorExit>,
    stopped: usize,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("session", &self.session)
            .field("monitor_count", &self.slots.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Create a supervisor writing through `sink` and probing with `prober`.
    pub fn new(sink: LogSink, prober: Arc<dyn Prober>, settings: SupervisorSettings) -> Self {
        let (exits_tx, exits_rx) = mpsc::channel();
        Self {
            sink,
            prober,
            settings,
            shutdown: ShutdownSignal::new(),
            session: None,
            slots: Vec::new(),
            exits_tx,
            exits_rx,
            failures: Vec::new(),
            stopped: 0,
        }
    }

    /// Start one monitor per host and return the run's session.
    ///
    /// The session is fixed by the first call; hosts added by later calls
    /// join it. A host whose log cannot be opened is recorded as failed and
    /// does not prevent the others from starting.
    pub fn start(&mut self, hosts: &[String]) -> Session {
        let session = self.prepare(hosts);
        self.launch();
        session
    }

    /// Open logs and create buses for `hosts` without spawning anything.
    ///
    /// Each prepared monitor counts as running; its first probe happens
    /// after the next [`Supervisor::launch`].
    pub fn prepare(&mut self, hosts: &[String]) -> Session {
        let session = self.session.get_or_insert_with(Session::now).clone();

        for host in hosts {
            self.prepare_slot(host, &session);
        }

        tracing::debug!(
            session = %session,
            monitors = hosts.len(),
            failed = self.failures.len(),
            "Monitors prepared"
        );
        session
    }

    /// Spawn every prepared monitor. Returns how many threads started.
    pub fn launch(&mut self) -> usize {
        let mut launched = 0;
        for slot in &mut self.slots {
            let Some(monitor) = slot.pending.take() else {
                continue;
            };
            match monitor.spawn(self.exits_tx.clone()) {
                Ok(thread) => {
                    slot.thread = Some(thread);
                    launched += 1;
                }
                Err(e) => {
                    tracing::error!(host = %slot.host, error = %e, "Failed to spawn host monitor");
                    slot.control = None;
                    slot.state.set(MonitorState::Stopped);
                    self.failures.push(MonitorExit {
                        index: slot.index,
                        host: slot.host.clone(),
                        result: Err(MonitorError::Spawn(e)),
                    });
                }
            }
        }

        if launched > 0 {
            tracing::info!(
                launched,
                failed = self.failures.len(),
                "Supervisor started"
            );
        }
        launched
    }

    /// Signal shared with every monitor; triggering it stops them all.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Number of monitors started, including failed ones.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.host.as_str())
    }

    pub fn state(&self, index: usize) -> Option<MonitorState> {
        self.slots.get(index).map(|slot| slot.state.get())
    }

    /// Monitors not yet `Stopped`.
    pub fn running_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state.get() != MonitorState::Stopped)
            .count()
    }

    pub fn log_path(&self, index: usize) -> Option<&Path> {
        self.slots.get(index).map(|slot| slot.log_path.as_path())
    }

    pub fn bus(&self, index: usize) -> Option<&Arc<ObserverBus>> {
        self.slots.get(index).map(|slot| &slot.bus)
    }

    /// Subscribe to the records of one monitor.
    pub fn subscribe(&self, index: usize) -> Option<Subscription> {
        self.bus(index).map(|bus| bus.subscribe())
    }

    /// One subscription per monitor, in host-list order.
    pub fn subscribe_all(&self) -> Vec<Subscription> {
        self.slots.iter().map(|slot| slot.bus.subscribe()).collect()
    }

    /// Ask one monitor to stop. Does not wait; the exit shows up in
    /// [`Supervisor::reap`].
    pub fn stop(&self, index: usize) -> bool {
        match self.slots.get(index).and_then(|slot| slot.control.as_ref()) {
            Some(control) => {
                control.stop();
                true
            }
            None => false,
        }
    }

    /// Collect exit reports without blocking. Returns how many arrived.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Ok(exit) = self.exits_rx.try_recv() {
            self.record_exit(exit);
            reaped += 1;
        }
        reaped
    }

    /// Monitors that ended with an error so far.
    pub fn failures(&self) -> &[MonitorExit] {
        &self.failures
    }

    /// Stop every monitor, waiting at most the configured shutdown timeout.
    pub fn stop_all(&mut self) -> ShutdownReport {
        self.stop_all_with_timeout(self.settings.shutdown_timeout)
    }

    /// Stop every monitor, waiting at most `timeout`.
    ///
    /// Monitors still busy when the bound elapses (e.g. stuck in a probe)
    /// are detached and reported as unresponsive.
    pub fn stop_all_with_timeout(&mut self, timeout: Duration) -> ShutdownReport {
        let deadline = Instant::now() + timeout;

        self.shutdown.trigger();
        for control in self.slots.iter().filter_map(|slot| slot.control.as_ref()) {
            control.stop();
        }

        // Never launched: releasing the monitor closes its log.
        for slot in &mut self.slots {
            if slot.pending.take().is_some() {
                slot.control = None;
                slot.state.set(MonitorState::Stopped);
                self.stopped += 1;
            }
        }

        while self.slots.iter().any(|slot| slot.thread.is_some()) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exits_rx.recv_timeout(remaining) {
                Ok(exit) => self.record_exit(exit),
                Err(_) => break,
            }
        }

        let mut unresponsive = Vec::new();
        for slot in &mut self.slots {
            if slot.thread.take().is_some() {
                tracing::warn!(host = %slot.host, "Monitor did not stop in time, detaching");
                slot.control = None;
                unresponsive.push(slot.host.clone());
            }
        }

        let report = ShutdownReport {
            stopped: self.stopped,
            failed: std::mem::take(&mut self.failures),
            unresponsive,
        };

        if report.is_clean() {
            tracing::info!(stopped = report.stopped, "All monitors stopped");
        } else {
            tracing::warn!(
                stopped = report.stopped,
                failed = report.failed.len(),
                unresponsive = report.unresponsive.len(),
                "Shutdown completed with problems"
            );
        }
        report
    }

    // --- Private helpers ---

    fn prepare_slot(&mut self, host: &str, session: &Session) {
        let index = self.slots.len();
        let bus = Arc::new(ObserverBus::with_capacity(
            host,
            self.settings.observer_capacity,
        ));
        let log_path = self.sink.path_for(host, session);

        let mut slot = MonitorSlot {
            index,
            host: host.to_string(),
            log_path,
            bus: Arc::clone(&bus),
            state: StateCell::new(),
            control: None,
            pending: None,
            thread: None,
        };

        match self.sink.open(host, session) {
            Ok(log) => {
                let (monitor, control) = HostMonitor::new(
                    index,
                    host,
                    log,
                    bus,
                    Arc::clone(&self.prober),
                    self.settings.interval,
                    self.shutdown.clone(),
                );
                slot.state = control.state();
                slot.control = Some(control);
                slot.pending = Some(monitor);
            }
            Err(e) => {
                tracing::error!(host = %host, error = %e, "Failed to start host monitor");
                slot.state.set(MonitorState::Stopped);
                self.failures.push(MonitorExit {
                    index,
                    host: host.to_string(),
                    result: Err(e.into()),
                });
            }
        }

        self.slots.push(slot);
    }

    fn record_exit(&mut self, exit: MonitorExit) {
        let Some(slot) = self.slots.get_mut(exit.index) else {
            return;
        };

        slot.control = None;
        if let Some(thread) = slot.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!(host = %slot.host, "Monitor thread panicked after reporting");
        }

        match exit.result {
            Ok(()) => self.stopped += 1,
            Err(_) => self.failures.push(exit),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Best effort: monitors notice at their next wake-up.
        if self.slots.iter().any(|slot| slot.thread.is_some()) {
            self.shutdown.trigger();
            for control in self.slots.iter().filter_map(|slot| slot.control.as_ref()) {
                control.stop();
            }
        }
    }
}
