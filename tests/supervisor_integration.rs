//! Supervisor Integration Tests
//!
//! Drives the public API end to end with scripted probers: startup under a
//! shared session, log files, observers, failure isolation and bounded
//! shutdown.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use pingwatch::{
    LogSink, MonitorError, MonitorState, ProbeError, ProbeOutcome, Prober, SinkError, Supervisor,
    SupervisorSettings, parse,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Replies to every host except those listed as down.
struct ScriptedProber {
    down: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    fn new(down: &[&str]) -> Self {
        Self {
            down: down.iter().map(|h| h.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Prober for ScriptedProber {
    fn probe(&self, host: &str) -> Result<ProbeOutcome, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.iter().any(|h| h == host) {
            Ok(parse(&format!("Request to {host} timed out."), false))
        } else {
            Ok(parse(
                &format!("Reply from {host}: bytes=32 time=12.3ms TTL=64"),
                true,
            ))
        }
    }
}

/// Never returns for the given host.
struct StuckProber {
    stuck: String,
}

impl Prober for StuckProber {
    fn probe(&self, host: &str) -> Result<ProbeOutcome, ProbeError> {
        if host == self.stuck {
            loop {
                thread::park();
            }
        }
        Ok(parse("time<1ms", true))
    }
}

fn settings() -> SupervisorSettings {
    SupervisorSettings::default()
        .with_interval(Duration::from_millis(20))
        .with_shutdown_timeout(Duration::from_secs(2))
}

fn hosts(list: &[&str]) -> Vec<String> {
    list.iter().map(|h| h.to_string()).collect()
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(10));
    }
}

fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|c| c.lines().count())
        .unwrap_or(0)
}

fn log_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =============================================================================
// Startup & Log Files
// =============================================================================

#[test]
fn test_three_hosts_three_files_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(ScriptedProber::new(&[])),
        settings(),
    );

    let session = supervisor.start(&hosts(&["10.0.0.1", "10.0.0.2", "gateway.local"]));
    assert_eq!(supervisor.len(), 3);

    let files = log_files(dir.path());
    assert_eq!(
        files,
        vec![
            format!("10.0.0.1_{session}.log"),
            format!("10.0.0.2_{session}.log"),
            format!("gateway.local_{session}.log"),
        ]
    );

    wait_for(|| (0..3).all(|i| line_count(supervisor.log_path(i).unwrap()) >= 2));

    let report = supervisor.stop_all();
    assert!(report.is_clean());
    assert_eq!(report.stopped, 3);
    assert_eq!(supervisor.running_count(), 0);

    let content = std::fs::read_to_string(dir.path().join(&files[2])).unwrap();
    for line in content.lines() {
        assert!(line.ends_with(": Ping to gateway.local successful, Time: 12.3ms"));
    }
}

#[test]
fn test_failed_probes_are_logged_and_probing_continues() {
    let dir = tempfile::tempdir().unwrap();
    let prober = Arc::new(ScriptedProber::new(&["10.0.0.9"]));
    let mut supervisor = Supervisor::new(LogSink::new(dir.path()), prober.clone(), settings());

    supervisor.start(&hosts(&["10.0.0.9"]));
    let path = supervisor.log_path(0).unwrap().to_path_buf();
    wait_for(|| line_count(&path) >= 3);

    assert_eq!(supervisor.state(0), Some(MonitorState::Running));
    let report = supervisor.stop_all();
    assert!(report.is_clean());

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.lines().all(|l| l.ends_with("Ping to 10.0.0.9 failed")));
    assert!(prober.calls.load(Ordering::SeqCst) >= 3);
}

#[test]
fn test_duplicate_hosts_get_independent_monitors() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(ScriptedProber::new(&[])),
        settings(),
    );

    supervisor.start(&hosts(&["10.0.0.1", "10.0.0.1"]));
    assert_eq!(supervisor.len(), 2);
    assert_eq!(supervisor.log_path(0), supervisor.log_path(1));

    let first = supervisor.subscribe(0).unwrap();
    let second = supervisor.subscribe(1).unwrap();
    wait_for(|| first.try_consume().is_some() && second.try_consume().is_some());

    supervisor.stop(0);
    wait_for(|| {
        supervisor.reap();
        supervisor.state(0) == Some(MonitorState::Stopped)
    });
    assert_eq!(supervisor.state(1), Some(MonitorState::Running));

    let report = supervisor.stop_all();
    assert_eq!(report.stopped, 2);

    // Both monitors appended whole lines to the shared file.
    let content = std::fs::read_to_string(supervisor.log_path(0).unwrap()).unwrap();
    assert!(content.lines().count() >= 2);
    assert!(content.lines().all(|l| l.contains("Ping to 10.0.0.1 successful")));
}

// =============================================================================
// Observers
// =============================================================================

#[test]
fn test_observers_receive_records_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(ScriptedProber::new(&[])),
        settings(),
    );
    supervisor.start(&hosts(&["10.0.0.1"]));
    let subscription = supervisor.subscribe(0).unwrap();

    let mut seen = Vec::new();
    wait_for(|| {
        seen.extend(subscription.drain());
        seen.len() >= 3
    });
    supervisor.stop_all();

    assert!(seen.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
    for record in &seen {
        assert_eq!(record.host, "10.0.0.1");
        assert!(record.sent_at <= record.received_at);
        assert_eq!(record.summary(), "Ping 10.0.0.1 success, 12.3ms");
    }
}

#[test]
fn test_subscribing_before_launch_sees_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(ScriptedProber::new(&["10.0.0.9"])),
        settings().with_interval(Duration::from_millis(1)),
    );

    supervisor.prepare(&hosts(&["10.0.0.9", "10.0.0.1"]));
    let subscriptions = supervisor.subscribe_all();
    assert_eq!(supervisor.launch(), 2);

    wait_for(|| (0..2).all(|i| line_count(supervisor.log_path(i).unwrap()) >= 5));
    assert!(supervisor.stop_all().is_clean());

    for (i, subscription) in subscriptions.iter().enumerate() {
        let seen = subscription.drain();
        let logged = line_count(supervisor.log_path(i).unwrap());
        assert_eq!(seen.len(), logged, "monitor {i} missed records");
    }
}

#[test]
fn test_absent_observer_never_blocks_probing() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(ScriptedProber::new(&[])),
        settings().with_observer_capacity(Some(1)),
    );
    supervisor.start(&hosts(&["10.0.0.1"]));

    // Subscribed but never drained.
    let _idle = supervisor.subscribe(0).unwrap();
    let path = supervisor.log_path(0).unwrap().to_path_buf();
    wait_for(|| line_count(&path) >= 5);

    assert!(supervisor.bus(0).unwrap().dropped() >= 1);
    assert!(supervisor.stop_all().is_clean());
}

#[test]
fn test_observer_initiated_stop() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(ScriptedProber::new(&[])),
        settings(),
    );
    supervisor.start(&hosts(&["10.0.0.1", "10.0.0.2"]));

    // A display pressing "stop" only holds the shared signal.
    let signal = supervisor.shutdown_signal();
    signal.trigger();

    wait_for(|| {
        supervisor.reap();
        supervisor.running_count() == 0
    });
    assert_eq!(supervisor.stop_all().stopped, 2);
}

// =============================================================================
// Failure Isolation & Bounded Shutdown
// =============================================================================

#[test]
fn test_log_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(ScriptedProber::new(&[])),
        settings(),
    );

    // A slash cannot be part of a log file name.
    supervisor.start(&hosts(&["10.0.0.1", "missing/host", "10.0.0.2"]));

    assert_eq!(supervisor.state(1), Some(MonitorState::Stopped));
    assert_eq!(supervisor.failures().len(), 1);
    assert_eq!(supervisor.failures()[0].host, "missing/host");

    wait_for(|| {
        line_count(supervisor.log_path(0).unwrap()) >= 2
            && line_count(supervisor.log_path(2).unwrap()) >= 2
    });
    assert_eq!(supervisor.state(0), Some(MonitorState::Running));
    assert_eq!(supervisor.state(2), Some(MonitorState::Running));

    let report = supervisor.stop_all();
    assert_eq!(report.stopped, 2);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].result,
        Err(MonitorError::Sink(SinkError::InvalidHost { .. }))
    ));
    assert_eq!(log_files(dir.path()).len(), 2);
    assert!(report.unresponsive.is_empty());
}

#[test]
fn test_stop_all_is_bounded_with_stuck_probe() {
    let dir = tempfile::tempdir().unwrap();
    let mut supervisor = Supervisor::new(
        LogSink::new(dir.path()),
        Arc::new(StuckProber {
            stuck: "10.0.0.3".to_string(),
        }),
        settings(),
    );
    supervisor.start(&hosts(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]));
    assert_eq!(log_files(dir.path()).len(), 3);

    wait_for(|| line_count(supervisor.log_path(0).unwrap()) >= 1);

    let started = Instant::now();
    let report = supervisor.stop_all_with_timeout(Duration::from_millis(300));
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(2), "stop_all took {elapsed:?}");
    assert_eq!(report.stopped, 2);
    assert_eq!(report.unresponsive, vec!["10.0.0.3".to_string()]);
    assert!(!report.is_clean());
    assert_eq!(line_count(supervisor.log_path(2).unwrap()), 0);
}
