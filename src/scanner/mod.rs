//! Scanning engine.
//!
//! - [`tcp`] probes one port with a bounded TCP connect.
//! - [`pool`] dispatches one probe per port under a concurrency bound.
//! - [`collector`] owns the result map and feeds the caller's stream.
//! - [`session`] ties them together and tracks the lifecycle.

pub mod collector;
pub mod pool;
pub mod session;
pub mod tcp;
pub mod traits;

pub use collector::{ResultStream, ScanReport};
pub use session::{start_scan, ScanSession, SessionHandle, SessionState};
pub use tcp::TcpConnectProber;
pub use traits::{ProbeResult, ProbeStatus, Prober};
