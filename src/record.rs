//! Probe records and run sessions.
//!
//! A [`Record`] is one completed probe, timestamped on both ends. Every log
//! file written during one process run carries the same [`Session`] in its
//! name.

use std::fmt;

use chrono::{DateTime, Local};

use crate::probe::ProbeOutcome;

/// Timestamp layout inside log lines (microsecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Session identifier layout, used as a filename component.
pub const SESSION_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Identifier shared by all log files of one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session(String);

impl Session {
    /// Session starting now.
    pub fn now() -> Self {
        Self::at(Local::now())
    }

    /// Session starting at `started`.
    pub fn at(started: DateTime<Local>) -> Self {
        Self(started.format(SESSION_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One completed probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Probed host, as listed in the host file.
    pub host: String,
    /// Captured right before the probe was issued.
    pub sent_at: DateTime<Local>,
    /// Captured right after the probe returned.
    pub received_at: DateTime<Local>,
    pub outcome: ProbeOutcome,
}

impl Record {
    pub fn new(
        host: impl Into<String>,
        sent_at: DateTime<Local>,
        received_at: DateTime<Local>,
        outcome: ProbeOutcome,
    ) -> Self {
        Self {
            host: host.into(),
            sent_at,
            received_at,
            outcome,
        }
    }

    /// Line written to the host's log file, without the trailing newline.
    ///
    /// ```text
    /// 2024-01-02 03:04:05.123456 - 2024-01-02 03:04:05.135790: Ping to 10.0.0.1 successful, Time: 12.3ms
    /// ```
    pub fn log_line(&self) -> String {
        let prefix = format!(
            "{} - {}: Ping to {}",
            self.sent_at.format(TIMESTAMP_FORMAT),
            self.received_at.format(TIMESTAMP_FORMAT),
            self.host,
        );

        match (self.outcome.success, &self.outcome.latency) {
            (true, Some(latency)) => format!("{prefix} successful, Time: {latency}ms"),
            (true, None) => format!("{prefix} successful, Time: Unknown"),
            (false, _) => format!("{prefix} failed"),
        }
    }

    /// Short form shown by live displays.
    pub fn summary(&self) -> String {
        match (self.outcome.success, &self.outcome.latency) {
            (true, Some(latency)) => format!("Ping {} success, {latency}ms", self.host),
            (true, None) => format!("Ping {} success Unknown ms", self.host),
            (false, _) => format!("Ping {} failed", self.host),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::parse;
    use chrono::TimeZone;

    fn at(micros: i64) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .unwrap()
            + chrono::Duration::microseconds(micros)
    }

    fn record(output: &str, succeeded: bool) -> Record {
        Record::new("10.0.0.1", at(123_456), at(135_790), parse(output, succeeded))
    }

    #[test]
    fn test_session_format() {
        let session = Session::at(at(0));
        assert_eq!(session.as_str(), "20240102_030405");
        assert_eq!(session.to_string(), "20240102_030405");
    }

    #[test]
    fn test_log_line_success() {
        let line = record("bytes=32 time=12.3ms TTL=117", true).log_line();
        assert_eq!(
            line,
            "2024-01-02 03:04:05.123456 - 2024-01-02 03:04:05.135790: \
             Ping to 10.0.0.1 successful, Time: 12.3ms"
        );
    }

    #[test]
    fn test_log_line_upper_bound() {
        let line = record("bytes=32 time<1ms TTL=128", true).log_line();
        assert!(line.ends_with("Ping to 10.0.0.1 successful, Time: <1ms"));
    }

    #[test]
    fn test_log_line_unknown_latency() {
        let line = record("bytes=32 TTL=128", true).log_line();
        assert!(line.ends_with("Ping to 10.0.0.1 successful, Time: Unknown"));
    }

    #[test]
    fn test_log_line_failed() {
        let line = record("time=12.3ms", false).log_line();
        assert!(line.ends_with(": Ping to 10.0.0.1 failed"));
        assert!(line.starts_with("2024-01-02 03:04:05.123456 - "));
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            record("time=12.3ms", true).summary(),
            "Ping 10.0.0.1 success, 12.3ms"
        );
        assert_eq!(
            record("no marker", true).summary(),
            "Ping 10.0.0.1 success Unknown ms"
        );
        assert_eq!(record("", false).summary(), "Ping 10.0.0.1 failed");
    }
}
