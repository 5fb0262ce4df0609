//! Error types for portsweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Per-port failures are
//! never errors: they surface as [`ProbeStatus::Error`](crate::scanner::ProbeStatus)
//! results. Only session setup can fail as a whole.

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Session-level failures.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("target resolution failed: {0}")]
    Resolution(#[from] TargetError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("scan session driver stopped unexpectedly: {0}")]
    Driver(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors loading or saving user settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("invalid port list in settings: {0}")]
    Ports(#[from] PortError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_message() {
        let err = ScanError::from(TargetError::NoAddressesFound("nowhere.invalid".into()));
        assert_eq!(
            err.to_string(),
            "target resolution failed: no IP addresses found for hostname 'nowhere.invalid'"
        );
    }
}
