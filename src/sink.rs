//! Log Sink
//!
//! Durable, append-only, per-host record files:
//! - [`LogSink`]: Owns the output directory and derives file identities
//! - [`LogHandle`]: Exclusive writer for one `(host, session)` file
//!
//! File names are `<output-dir>/<host>_<session>.log`. Files are opened in
//! append mode and created if absent, so reopening within a session never
//! truncates earlier records.

mod error;
mod file;

pub use error::SinkError;
pub use file::{LogHandle, LogSink};
