//! Configuration management for portsweep.
//!
//! `ScanConfig` carries the knobs of one session; `AppSettings` holds the
//! user's persisted defaults.

mod scan;
mod settings;

pub use scan::{ResultFilter, ScanConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, MAX_CONCURRENCY};
pub use settings::{AppSettings, Paths};
