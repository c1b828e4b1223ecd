//! ICMP echo probe.
//!
//! Issues the echo request directly through `surge-ping` instead of spawning
//! a process. The socket lives on a tokio runtime; monitor threads drive it
//! through a runtime [`Handle`].

use std::net::IpAddr;
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tokio::runtime::Handle;
use tokio::time::timeout;

use super::parser::parse;
use super::traits::{ProbeError, ProbeOutcome, Prober};

/// Raw ICMP prober.
///
/// Opening an ICMP socket usually needs elevated privileges (or
/// `net.ipv4.ping_group_range` on Linux); that failure is reported as
/// [`ProbeError::Socket`].
#[derive(Debug, Clone)]
pub struct IcmpProber {
    runtime: Handle,
    timeout: Duration,
}

impl IcmpProber {
    /// Create a prober driven by `runtime`.
    pub fn new(runtime: Handle, timeout: Duration) -> Self {
        Self { runtime, timeout }
    }

    /// Create a prober bound to the runtime of the calling context.
    ///
    /// # Errors
    /// Returns [`ProbeError::Unavailable`] when called outside a tokio runtime.
    pub fn from_current(timeout: Duration) -> Result<Self, ProbeError> {
        let runtime = Handle::try_current().map_err(|e| ProbeError::Unavailable(e.to_string()))?;
        Ok(Self::new(runtime, timeout))
    }

    async fn ping(&self, host: &str) -> Result<ProbeOutcome, ProbeError> {
        let ip = match resolve_host(host).await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "Failed to resolve hostname");
                return Ok(ProbeOutcome::failed(format!("cannot resolve {host}: {e}")));
            }
        };

        let config = match ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(ProbeError::Socket)?;

        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(self.timeout);

        let outcome = match timeout(self.timeout, pinger.ping(PingSequence(0), &[])).await {
            Ok(Ok((_, rtt))) => {
                let ms = rtt.as_secs_f64() * 1000.0;
                parse(&format!("Reply from {ip}: time={ms:.3}ms"), true)
            }
            Ok(Err(e)) => parse(&format!("Request to {ip} failed: {e}"), false),
            Err(_) => parse(&format!("Request to {ip} timed out"), false),
        };
        Ok(outcome)
    }
}

impl Prober for IcmpProber {
    fn probe(&self, host: &str) -> Result<ProbeOutcome, ProbeError> {
        if Handle::try_current().is_ok() {
            return Err(ProbeError::Unavailable(
                "ICMP prober must be called from a plain thread".to_string(),
            ));
        }
        self.runtime.block_on(self.ping(host))
    }
}

/// Resolve hostname to IP address.
async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}
