//! Sink-specific error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing record files.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output directory could not be created.
    #[error("failed to create output directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The log file could not be opened for appending.
    #[error("failed to open log file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host name cannot be used as a file name inside the output
    /// directory.
    #[error("host '{host}' is not a valid log file name")]
    InvalidHost { host: String },

    /// A record could not be appended.
    #[error("failed to append to log file '{}': {source}", .path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
