//! Probe abstraction.
//!
//! Defines the outcome vocabulary of a single probe and the `Prober` trait
//! the worker pool drives, so the pool can be exercised with instrumented
//! probers in tests.

use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Handshake completed; something is listening.
    Open,
    /// Connection actively refused (RST received).
    Closed,
    /// No answer before the timeout. Firewall drop and packet loss are
    /// indistinguishable here and are deliberately reported the same way.
    Filtered,
    /// Any other failure, e.g. no route or local resource exhaustion.
    Error,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Filtered => "filtered",
            Self::Error => "error",
        })
    }
}

/// Result of probing a single port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The port that was probed.
    pub port: Port,
    /// Classified outcome.
    pub status: ProbeStatus,
    /// Time until the connection was established or refused, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// Diagnostic reason, set for `Error` results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn new(port: Port, status: ProbeStatus) -> Self {
        Self {
            port,
            status,
            latency_ms: None,
            error: None,
        }
    }

    /// An `Error` result carrying a diagnostic reason.
    pub fn error(port: Port, reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::new(port, ProbeStatus::Error)
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = Some(latency.as_micros() as f64 / 1000.0);
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == ProbeStatus::Open
    }
}

/// Performs one bounded connection attempt and classifies it.
///
/// Implementations must make exactly one attempt, must not return later than
/// `timeout` plus scheduling slack, and must release any connection resource
/// before returning. They never fail: every outcome is a [`ProbeResult`].
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: IpAddr, port: Port, timeout: Duration) -> ProbeResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_status_display() {
        assert_eq!(ProbeStatus::Open.to_string(), "open");
        assert_eq!(ProbeStatus::Closed.to_string(), "closed");
        assert_eq!(ProbeStatus::Filtered.to_string(), "filtered");
        assert_eq!(ProbeStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_probe_result_builders() {
        let port = Port::new(80).unwrap();
        let result = ProbeResult::new(port, ProbeStatus::Open).with_latency(Duration::from_micros(1500));
        assert!(result.is_open());
        assert_eq!(result.latency_ms, Some(1.5));

        let failed = ProbeResult::error(port, "no route to host");
        assert_eq!(failed.status, ProbeStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("no route to host"));
    }

    #[test]
    fn test_probe_result_json_shape() {
        let port = Port::new(22).unwrap();
        let json = serde_json::to_value(ProbeResult::new(port, ProbeStatus::Closed)).unwrap();
        assert_eq!(json, serde_json::json!({ "port": 22, "status": "closed" }));
    }
}
