//! Probe Layer
//!
//! One round-trip reachability check against a single host.
//!
//! - [`Prober`]: Blocking probe contract used by host monitors
//! - [`parse`]: Pure latency extraction from raw ping output
//! - [`SystemPingProber`]: Shells out to the platform `ping` utility
//! - [`IcmpProber`]: Raw ICMP echo via `surge-ping`
//!
//! A probe that does not reach its target is not an error: it yields a
//! [`ProbeOutcome`] with `success == false`. Only local failures (the ping
//! utility cannot be spawned, no ICMP socket) surface as [`ProbeError`].

mod icmp;
mod parser;
mod system;
mod traits;

pub use icmp::IcmpProber;
pub use parser::parse;
pub use system::SystemPingProber;
pub use traits::{Latency, ProbeError, ProbeOutcome, Prober};
