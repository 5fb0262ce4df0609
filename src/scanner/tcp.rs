//! TCP connect prober.
//!
//! Completes (or fails) a full TCP handshake using the operating system's
//! socket API. Needs no privileges but is visible to the target's logs.

use crate::scanner::traits::{ProbeResult, ProbeStatus, Prober};
use crate::types::Port;
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Connect-scan prober.
///
/// Each call opens at most one socket, which is dropped before `probe`
/// returns on every path.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnectProber;

impl TcpConnectProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for TcpConnectProber {
    async fn probe(&self, target: IpAddr, port: Port, limit: Duration) -> ProbeResult {
        let addr = SocketAddr::new(target, port.as_u16());
        let result = connect_within(port, limit, TcpStream::connect(addr)).await;
        debug!(%addr, status = %result.status, error = ?result.error, "probe finished");
        result
    }
}

/// Drive a single connection attempt under `limit` and classify it.
///
/// The established connection, if any, lives only inside this function.
pub(crate) async fn connect_within<F, S>(port: Port, limit: Duration, connect: F) -> ProbeResult
where
    F: Future<Output = io::Result<S>>,
{
    let start = Instant::now();

    match timeout(limit, connect).await {
        Ok(Ok(stream)) => {
            let latency = start.elapsed();
            drop(stream);
            ProbeResult::new(port, ProbeStatus::Open).with_latency(latency)
        }
        Ok(Err(e)) => match classify_connect_error(&e) {
            ProbeStatus::Error => ProbeResult::error(port, e.to_string()),
            status => ProbeResult::new(port, status).with_latency(start.elapsed()),
        },
        Err(_) => ProbeResult::new(port, ProbeStatus::Filtered),
    }
}

/// Map a failed `connect()` to a port status.
///
/// An OS-level connect timeout means the same thing as ours: silence.
pub(crate) fn classify_connect_error(err: &io::Error) -> ProbeStatus {
    match err.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => ProbeStatus::Closed,
        io::ErrorKind::TimedOut => ProbeStatus::Filtered,
        _ => ProbeStatus::Error,
    }
}
