//! Per-session scan configuration.

use crate::error::{ScanError, ScanResult};
use crate::scanner::{ProbeResult, ProbeStatus};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default number of probes allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Largest accepted concurrency bound; the pool's semaphore holds no more
/// permits than this.
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

/// Default per-probe connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Which results the result stream yields.
///
/// Filtering never affects accounting: the final report holds every result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResultFilter {
    /// Yield everything.
    #[default]
    All,
    /// Yield only `Open` results.
    OpenOnly,
    /// Yield results whose status is in the list.
    Statuses(Vec<ProbeStatus>),
}

impl ResultFilter {
    pub fn accepts(&self, result: &ProbeResult) -> bool {
        match self {
            Self::All => true,
            Self::OpenOnly => result.is_open(),
            Self::Statuses(statuses) => statuses.contains(&result.status),
        }
    }
}

/// Knobs for one scan session.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum probes in flight at any instant.
    pub concurrency: usize,
    /// Per-probe connect timeout.
    pub timeout: Duration,
    /// Filter applied to the result stream.
    pub filter: ResultFilter,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            filter: ResultFilter::All,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_filter(mut self, filter: ResultFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Reject settings the pool cannot run with.
    pub fn validate(&self) -> ScanResult<()> {
        if self.concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(ScanError::InvalidConfig(format!(
                "concurrency must be at most {}",
                MAX_CONCURRENCY
            )));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScanConfig::default();
        assert_eq!(config.concurrency, 100);
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(ScanConfig::new().with_concurrency(0).validate().is_err());
        assert!(ScanConfig::new().with_timeout(Duration::ZERO).validate().is_err());
        assert!(ScanConfig::new()
            .with_concurrency(usize::MAX)
            .validate()
            .is_err());
        assert!(ScanConfig::new()
            .with_concurrency(MAX_CONCURRENCY)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_filters() {
        let port = Port::new(80).unwrap();
        let open = ProbeResult::new(port, ProbeStatus::Open);
        let closed = ProbeResult::new(port, ProbeStatus::Closed);

        assert!(ResultFilter::All.accepts(&closed));
        assert!(ResultFilter::OpenOnly.accepts(&open));
        assert!(!ResultFilter::OpenOnly.accepts(&closed));

        let filter = ResultFilter::Statuses(vec![ProbeStatus::Closed, ProbeStatus::Error]);
        assert!(filter.accepts(&closed));
        assert!(!filter.accepts(&open));
    }
}
