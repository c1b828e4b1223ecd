//! Console display.
//!
//! A live observer that polls host subscriptions on a fixed cadence and
//! prints one short line per record. It only consumes; probing and logging
//! never wait on it. Typing `q` on the console stops the run.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::monitor::ShutdownSignal;
use crate::observer::Subscription;

/// Console lines that request a stop.
const STOP_COMMANDS: [&str; 2] = ["q", "quit"];

/// Prints record summaries from a set of subscriptions.
#[derive(Debug)]
pub struct ConsoleDisplay {
    subscriptions: Vec<Subscription>,
    poll_interval: Duration,
}

impl ConsoleDisplay {
    pub fn new(subscriptions: Vec<Subscription>, poll_interval: Duration) -> Self {
        Self {
            subscriptions,
            poll_interval,
        }
    }

    /// Write every queued record, host by host. Returns the number written.
    pub fn render_pending<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let mut written = 0;
        for subscription in &self.subscriptions {
            while let Some(record) = subscription.try_consume() {
                writeln!(out, "{}", record.summary())?;
                written += 1;
            }
        }
        if written > 0 {
            out.flush()?;
        }
        Ok(written)
    }

    /// Poll until `stop` is triggered, then render what is left and return.
    pub async fn run<W: Write + Send>(self, mut out: W, stop: ShutdownSignal) -> io::Result<()> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let stopping = stop.is_triggered();
            self.render_pending(&mut out)?;
            if stopping {
                break;
            }
        }

        tracing::debug!("Console display stopped");
        Ok(())
    }
}

/// Read console lines until a stop command, then trigger `stop`.
///
/// Returns `true` if a stop command was read. End of input or a read error
/// ends the watch and leaves `stop` alone, so a closed stdin never stops
/// a run.
pub fn watch_stop_input<R: BufRead>(input: R, stop: &ShutdownSignal) -> bool {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!("Stop input unreadable: {}", e);
                return false;
            }
        };
        let command = line.trim();
        if STOP_COMMANDS.iter().any(|c| c.eq_ignore_ascii_case(command)) {
            tracing::info!("Stop requested from console");
            stop.trigger();
            return true;
        }
    }
    false
}

/// Watch stdin for a stop command on a detached thread.
///
/// A blocking stdin read cannot be cancelled, so the thread is never joined
/// and does not hold up process exit.
pub fn spawn_stop_input(stop: ShutdownSignal) -> io::Result<JoinHandle<bool>> {
    thread::Builder::new()
        .name("stop-input".to_string())
        .spawn(move || watch_stop_input(io::stdin().lock(), &stop))
}
