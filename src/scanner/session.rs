//! Scan session lifecycle.
//!
//! A session moves `Created -> Running -> {Completed | Cancelled | Failed}`.
//! Starting a session spawns a driver task that resolves the target once,
//! runs the scheduler and the collector side by side, and publishes the
//! terminal state. The caller gets a [`SessionHandle`] for control and a
//! [`ResultStream`] for results as they arrive.

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::scanner::collector::{Collector, ResultStream, ScanReport};
use crate::scanner::pool::{InFlightGauge, Scheduler};
use crate::scanner::tcp::TcpConnectProber;
use crate::scanner::traits::{ProbeResult, Prober};
use crate::types::{DnsResolver, PortSet, Resolver, SessionId};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle state of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Built, nothing dispatched.
    Created,
    /// Target resolved, probes being dispatched or executed.
    Running,
    /// Every requested port has exactly one result.
    Completed,
    /// Cancelled before all probes finished; the partial results are final.
    Cancelled,
    /// Setup failed before any probe ran, or the session's own machinery
    /// broke down. No results.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Created, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Cancelled)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A scan that has been described but not started.
#[derive(Debug, Clone)]
pub struct ScanSession {
    id: SessionId,
    host: String,
    ports: PortSet,
    config: ScanConfig,
}

impl ScanSession {
    pub fn new(host: impl Into<String>, ports: PortSet, config: ScanConfig) -> Self {
        Self {
            id: SessionId::new(),
            host: host.into(),
            ports,
            config,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Start with DNS resolution and TCP connect probes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> ScanResult<(SessionHandle, ResultStream)> {
        self.start_with(Arc::new(DnsResolver), Arc::new(TcpConnectProber))
    }

    /// Start with a caller-supplied resolver and prober.
    ///
    /// Returns immediately. An invalid configuration is rejected here;
    /// resolution failure is reported through the handle as `Failed`.
    pub fn start_with(
        self,
        resolver: Arc<dyn Resolver>,
        prober: Arc<dyn Prober>,
    ) -> ScanResult<(SessionHandle, ResultStream)> {
        self.config.validate()?;

        let (state_tx, state_rx) = watch::channel(SessionState::Created);
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let requested = self.ports.len();
        let id = self.id;

        let driver = Driver {
            session: self,
            resolver,
            prober,
            state: state_tx,
            cancel: cancel.clone(),
            completed: Arc::clone(&completed),
        };
        let task = tokio::spawn(driver.run(forward_tx));

        let handle = SessionHandle {
            id,
            cancel,
            state: state_rx,
            completed,
            requested,
            task,
        };
        Ok((handle, ResultStream::new(forward_rx)))
    }
}

/// Start a connect scan of `ports` on `host`.
///
/// Shorthand for `ScanSession::new(host, ports, config).start()`.
pub fn start_scan(
    host: impl Into<String>,
    ports: PortSet,
    config: ScanConfig,
) -> ScanResult<(SessionHandle, ResultStream)> {
    ScanSession::new(host, ports, config).start()
}

/// Control side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    completed: Arc<AtomicUsize>,
    requested: usize,
    task: JoinHandle<ScanResult<ScanReport>>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Results recorded so far, regardless of the stream filter.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Stop dispatching new probes. In-flight probes finish normally.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this session, for wiring to signals or deadlines.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait until the state is terminal and return it.
    pub async fn wait_terminal(&mut self) -> SessionState {
        let waited = self
            .state
            .wait_for(|s| s.is_terminal())
            .await
            .map(|state| *state)
            .ok();
        // The driver is gone if waiting failed; whatever it published last is final.
        waited.unwrap_or_else(|| *self.state.borrow())
    }

    /// Wait for the session to end and return its final status map.
    ///
    /// Errors if the session failed during setup.
    pub async fn await_completion(self) -> ScanResult<ScanReport> {
        self.task
            .await
            .map_err(|e| ScanError::Driver(e.to_string()))?
    }
}

struct Driver {
    session: ScanSession,
    resolver: Arc<dyn Resolver>,
    prober: Arc<dyn Prober>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    completed: Arc<AtomicUsize>,
}

impl Driver {
    /// Run the session to a terminal state. Every exit path publishes one.
    async fn run(self, forward: mpsc::UnboundedSender<ProbeResult>) -> ScanResult<ScanReport> {
        let result = self.execute(forward).await;
        match &result {
            Ok(report) => {
                info!(
                    session = %self.session.id.short(),
                    state = %report.state,
                    "{}",
                    report.summary()
                );
                // Publish last so a caller woken by the state sees the stream closed too.
                advance(&self.state, report.state);
            }
            Err(e) => {
                warn!(
                    session = %self.session.id.short(),
                    host = %self.session.host,
                    error = %e,
                    "scan failed"
                );
                advance(&self.state, SessionState::Failed);
            }
        }
        result
    }

    async fn execute(
        &self,
        forward: mpsc::UnboundedSender<ProbeResult>,
    ) -> ScanResult<ScanReport> {
        let session = &self.session;
        let started_at = Utc::now();
        let clock = Instant::now();

        let target = self.resolver.resolve(&session.host).await?;

        advance(&self.state, SessionState::Running);
        let requested = session.ports.len();
        info!(
            session = %session.id.short(),
            %target,
            ports = requested,
            concurrency = session.config.concurrency,
            timeout_ms = session.config.timeout.as_millis() as u64,
            "scan started"
        );

        let gauge = Arc::new(InFlightGauge::default());
        let scheduler = Scheduler::new(
            Arc::clone(&self.prober),
            target.ip,
            session.config.concurrency,
            session.config.timeout,
            self.cancel.clone(),
            Arc::clone(&gauge),
        );
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let dispatch = tokio::spawn(scheduler.run(session.ports.clone(), results_tx));

        let collector = Collector::new(
            session.config.filter.clone(),
            Arc::clone(&self.completed),
            forward,
        );
        let results = collector.run(results_rx).await;
        let dispatched = dispatch
            .await
            .map_err(|e| ScanError::Driver(e.to_string()))?;
        debug!(
            session = %session.id.short(),
            dispatched,
            collected = results.len(),
            "dispatch finished"
        );

        let outcome = if results.len() == requested {
            SessionState::Completed
        } else if self.cancel.is_cancelled() {
            SessionState::Cancelled
        } else {
            return Err(ScanError::Driver(format!(
                "{} of {} results collected without cancellation",
                results.len(),
                requested
            )));
        };

        Ok(ScanReport {
            session_id: session.id,
            target,
            state: outcome,
            requested,
            peak_in_flight: gauge.peak(),
            started_at,
            finished_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
            results,
        })
    }
}

fn advance(state: &watch::Sender<SessionState>, next: SessionState) {
    let current = *state.borrow();
    debug_assert!(
        current.can_transition_to(next),
        "illegal session transition {current} -> {next}"
    );
    state.send_replace(next);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Created.is_terminal());
        assert!(!SessionState::Running.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::Failed.is_terminal());
    }

    #[test]
    fn test_transitions() {
        use SessionState::*;
        assert!(Created.can_transition_to(Running));
        assert!(Created.can_transition_to(Failed));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Cancelled));

        assert!(Running.can_transition_to(Failed));

        assert!(!Created.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Created));
        for terminal in [Completed, Cancelled, Failed] {
            for next in [Created, Running, Completed, Cancelled, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[tokio::test]
    async fn test_handle_starts_in_created() {
        let session = ScanSession::new("127.0.0.1", PortSet::new(), ScanConfig::default());
        let (mut handle, _stream) = session.start().unwrap();

        // The driver has not been polled yet on the current-thread runtime.
        assert_eq!(handle.state(), SessionState::Created);
        assert_eq!(handle.wait_terminal().await, SessionState::Completed);
    }

    #[tokio::test]
    async fn test_dispatch_fault_publishes_failed() {
        // Bypasses validation so the pool cannot build its semaphore.
        let session = ScanSession::new(
            "127.0.0.1",
            PortSet::try_from_u16s([80]).unwrap(),
            ScanConfig::default().with_concurrency(usize::MAX),
        );
        let (state_tx, state_rx) = watch::channel(SessionState::Created);
        let (forward_tx, mut forward_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            session,
            resolver: Arc::new(DnsResolver),
            prober: Arc::new(TcpConnectProber),
            state: state_tx,
            cancel: CancellationToken::new(),
            completed: Arc::new(AtomicUsize::new(0)),
        };

        let err = driver.run(forward_tx).await.unwrap_err();

        assert!(matches!(err, ScanError::Driver(_)));
        assert_eq!(*state_rx.borrow(), SessionState::Failed);
        assert!(forward_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_start() {
        let config = ScanConfig::default().with_concurrency(0);
        let err = start_scan("127.0.0.1", PortSet::well_known(), config).unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }
}
