//! pingwatch Binary Entry Point
//!
//! Loads the host list, starts one monitor per host and prints live
//! results until interrupted, told to stop on the console, or left with no
//! running monitor. Core functionality is provided by the `pingwatch`
//! library crate.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pingwatch::{
    AppConfig, ConsoleDisplay, LogSink, ProbeMethod, ShutdownSignal, Supervisor,
    config::{load_hosts, parse_duration},
    spawn_stop_input,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the main task checks for a requested stop and dead monitors.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why the run is ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Interrupted,
    Terminated,
    Requested,
    /// Every monitor has exited on its own.
    MonitorsExited,
}

/// pingwatch - per-host latency logger
#[derive(Parser, Debug)]
#[command(name = "pingwatch", version, about, long_about = None)]
struct Cli {
    /// Path to an optional YAML configuration file
    #[arg(short, long, env = "PINGWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Host list, one host per line (overrides config file)
    #[arg(long, env = "PINGWATCH_HOSTS")]
    hosts: Option<PathBuf>,

    /// Directory for per-host log files (overrides config file)
    #[arg(short, long, env = "PINGWATCH_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Probing mechanism (overrides config file)
    #[arg(long, value_enum, env = "PINGWATCH_METHOD")]
    method: Option<ProbeMethod>,

    /// Delay between probes, e.g. `1s`, `500ms` (overrides config file)
    #[arg(long, value_parser = parse_duration, env = "PINGWATCH_INTERVAL")]
    interval: Option<Duration>,

    /// Do not print live results
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pingwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration (CLI > ENV > config file > defaults)
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(hosts) = cli.hosts {
        config.hosts_file = hosts;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(method) = cli.method {
        config.probe.method = method;
    }
    if let Some(interval) = cli.interval {
        config.probe.interval = interval;
    }
    if cli.quiet {
        config.display.enabled = false;
    }
    config.validate()?;

    let hosts = load_hosts(&config.hosts_file)?;
    tracing::info!(
        "Loaded {} hosts from {}",
        hosts.len(),
        config.hosts_file.display()
    );
    if hosts.is_empty() {
        tracing::warn!("Host list is empty, nothing to monitor");
        return Ok(());
    }

    let sink = LogSink::create(&config.output_dir)?;
    let prober = config.probe.build_prober()?;
    tracing::info!(
        "Probe: {:?} every {:?} (timeout {:?}), output: {}",
        config.probe.method,
        config.probe.interval,
        config.probe.timeout,
        config.output_dir.display(),
    );

    let mut supervisor = Supervisor::new(sink, prober, config.supervisor_settings());
    let session = supervisor.prepare(&hosts);
    let shutdown = supervisor.shutdown_signal();

    // Subscribe before launching so the display sees the first records.
    let display_stop = ShutdownSignal::new();
    let display = config.display.enabled.then(|| {
        let display = ConsoleDisplay::new(supervisor.subscribe_all(), config.display.poll_interval);
        tokio::spawn(display.run(std::io::stdout(), display_stop.clone()))
    });

    if let Err(e) = spawn_stop_input(shutdown.clone()) {
        tracing::warn!("Console stop input unavailable: {}", e);
    }
    supervisor.launch();
    tracing::info!(
        "Session {} started, press Ctrl+C or type q + Enter to stop",
        session
    );

    let reason = wait_for_stop(&mut supervisor, &shutdown).await;
    shutdown.trigger();

    tracing::info!("Stopping monitors...");
    let report = tokio::task::spawn_blocking(move || supervisor.stop_all()).await?;
    for exit in &report.failed {
        if let Err(e) = &exit.result {
            tracing::error!("Monitor for '{}' failed: {}", exit.host, e);
        }
    }
    for host in &report.unresponsive {
        tracing::warn!("Monitor for '{}' did not stop in time", host);
    }

    display_stop.trigger();
    if let Some(display) = display {
        if let Err(e) = display.await? {
            tracing::warn!("Console display failed: {}", e);
        }
    }

    if reason == StopReason::MonitorsExited {
        return Err("every host monitor has exited".into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C, SIGTERM, a stop requested through `shutdown`, or the
/// last monitor to exit.
async fn wait_for_stop(supervisor: &mut Supervisor, shutdown: &ShutdownSignal) -> StopReason {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let watch = async {
        let mut ticker = tokio::time::interval(STOP_POLL_INTERVAL);
        loop {
            ticker.tick().await;
            if shutdown.is_triggered() {
                return StopReason::Requested;
            }
            supervisor.reap();
            if supervisor.running_count() == 0 {
                return StopReason::MonitorsExited;
            }
        }
    };

    let reason = tokio::select! {
        _ = ctrl_c => StopReason::Interrupted,
        _ = terminate => StopReason::Terminated,
        reason = watch => reason,
    };

    match reason {
        StopReason::Interrupted => tracing::info!("Received Ctrl+C signal"),
        StopReason::Terminated => tracing::info!("Received terminate signal"),
        StopReason::Requested => tracing::info!("Stop requested by observer"),
        StopReason::MonitorsExited => tracing::error!("All host monitors have exited"),
    }
    reason
}
