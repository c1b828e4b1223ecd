//! Append-only record files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::record::{Record, Session};
use crate::sink::SinkError;

/// Factory for per-host log handles rooted at one output directory.
#[derive(Debug, Clone)]
pub struct LogSink {
    output_dir: PathBuf,
}

impl LogSink {
    /// Sink rooted at `output_dir`. The directory is not touched.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Sink rooted at `output_dir`, creating the directory if needed.
    pub fn create(output_dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let sink = Self::new(output_dir);
        std::fs::create_dir_all(&sink.output_dir).map_err(|source| SinkError::CreateDir {
            path: sink.output_dir.clone(),
            source,
        })?;
        Ok(sink)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File identity for `(host, session)`.
    pub fn path_for(&self, host: &str, session: &Session) -> PathBuf {
        self.output_dir.join(format!("{host}_{session}.log"))
    }

    /// Open (or create) the log file for `(host, session)` in append mode.
    ///
    /// Hosts that would resolve outside the output directory are rejected
    /// with [`SinkError::InvalidHost`].
    pub fn open(&self, host: &str, session: &Session) -> Result<LogHandle, SinkError> {
        if !is_file_safe(host) {
            return Err(SinkError::InvalidHost {
                host: host.to_owned(),
            });
        }
        let path = self.path_for(host, session);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(host = %host, path = %path.display(), "Opened log file");
        Ok(LogHandle {
            path,
            file,
            appended: 0,
        })
    }
}

/// A host name must stay a single path component once joined.
fn is_file_safe(host: &str) -> bool {
    !host.is_empty()
        && host != "."
        && host != ".."
        && !host.contains(['/', '\\', '\0'])
}

/// Exclusive append handle for one host's session log.
///
/// Appends take `&mut self`; a handle has exactly one writer for its whole
/// lifetime.
#[derive(Debug)]
pub struct LogHandle {
    path: PathBuf,
    file: File,
    appended: u64,
}

impl LogHandle {
    /// Append one record as a single line.
    ///
    /// The line is handed to the OS in one write and flushed before this
    /// returns; nothing stays buffered in the process.
    pub fn append(&mut self, record: &Record) -> Result<(), SinkError> {
        let mut line = record.log_line();
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| SinkError::Append {
                path: self.path.clone(),
                source,
            })?;

        self.appended += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle.
    pub fn appended(&self) -> u64 {
        self.appended
    }
}
