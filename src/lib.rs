//! # portsweep - Bounded-Concurrency TCP Connect Scanning
//!
//! portsweep probes one host across a set of TCP ports and classifies each
//! port as open, closed, filtered or errored. Probes run on a bounded worker
//! pool so a scan is fast without exhausting local sockets or flooding the
//! target. Intended for authorized reconnaissance only.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use portsweep::config::{ResultFilter, ScanConfig};
//! use portsweep::scanner::start_scan;
//! use portsweep::types::PortSet;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ports: PortSet = "22,80,443".parse()?;
//!     let config = ScanConfig::new()
//!         .with_concurrency(10)
//!         .with_timeout(Duration::from_millis(500))
//!         .with_filter(ResultFilter::OpenOnly);
//!
//!     let (handle, mut results) = start_scan("127.0.0.1", ports, config)?;
//!     while let Some(result) = results.next().await {
//!         println!("{} is {}", result.port, result.status);
//!     }
//!
//!     let report = handle.await_completion().await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - ports, port sets, targets and session identifiers
//! - [`scanner`] - the prober, worker pool, collector and session lifecycle
//! - [`config`] - per-scan configuration and persisted user settings
//! - [`output`] - plain, JSON and CSV reporters
//! - [`cli`] - command-line argument definitions
//! - [`error`] - error types

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use config::{ResultFilter, ScanConfig};
pub use error::{ScanError, ScanResult};
pub use scanner::{
    start_scan, ProbeResult, ProbeStatus, Prober, ResultStream, ScanReport, ScanSession,
    SessionHandle, SessionState,
};
pub use types::{Port, PortSet, Target};
