//! Bounded worker pool.
//!
//! The scheduler turns a `PortSet` into one probe task per port and keeps at
//! most `concurrency` of them in flight. A semaphore provides the slots; each
//! task holds its permit until its result has been handed to the collector.
//!
//! Cancellation is cooperative. Once the token fires no further task is
//! spawned, but tasks already running finish their (time-bounded) probe.

use crate::scanner::traits::{ProbeResult, Prober};
use crate::types::{Port, PortSet};
use futures::FutureExt;
use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Counts probes currently executing and remembers the high-water mark.
#[derive(Debug, Default)]
pub struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> InFlightSlot {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightSlot(Arc::clone(self))
    }
}

/// Decrements the gauge when the probe that owns it ends.
struct InFlightSlot(Arc<InFlightGauge>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Dispatches probes for one session.
pub(crate) struct Scheduler {
    prober: Arc<dyn Prober>,
    target: IpAddr,
    concurrency: usize,
    timeout: Duration,
    cancel: CancellationToken,
    gauge: Arc<InFlightGauge>,
}

impl Scheduler {
    pub(crate) fn new(
        prober: Arc<dyn Prober>,
        target: IpAddr,
        concurrency: usize,
        timeout: Duration,
        cancel: CancellationToken,
        gauge: Arc<InFlightGauge>,
    ) -> Self {
        Self {
            prober,
            target,
            concurrency,
            timeout,
            cancel,
            gauge,
        }
    }

    /// Dispatch one probe per port, sending each result on `results`.
    ///
    /// Returns once every dispatched probe has finished; the number returned is
    /// how many probes were dispatched. The channel closes when the last
    /// worker drops its sender.
    pub(crate) async fn run(
        self,
        ports: PortSet,
        results: mpsc::UnboundedSender<ProbeResult>,
    ) -> usize {
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();
        let mut dispatched = 0;

        for port in ports {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(
                        dispatched,
                        in_flight = self.gauge.current(),
                        "cancellation observed, dispatch stopped"
                    );
                    break;
                }
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let prober = Arc::clone(&self.prober);
            let gauge = Arc::clone(&self.gauge);
            let results = results.clone();
            let (target, timeout) = (self.target, self.timeout);

            workers.spawn(async move {
                let _permit = permit;
                let result = {
                    let _slot = gauge.enter();
                    run_probe(prober.as_ref(), target, port, timeout).await
                };
                // A closed channel means the collector is gone; nothing to report to.
                let _ = results.send(result);
            });
            dispatched += 1;

            while workers.try_join_next().is_some() {}
        }

        drop(results);
        while workers.join_next().await.is_some() {}
        dispatched
    }
}

/// Run one probe, turning a panic into an `Error` result for that port only.
async fn run_probe(
    prober: &dyn Prober,
    target: IpAddr,
    port: Port,
    timeout: Duration,
) -> ProbeResult {
    match AssertUnwindSafe(prober.probe(target, port, timeout))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!(%target, %port, "probe panicked");
            ProbeResult::error(port, "probe panicked")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::ProbeStatus;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    struct SleepyProber(Duration);

    #[async_trait]
    impl Prober for SleepyProber {
        async fn probe(&self, _target: IpAddr, port: Port, _timeout: Duration) -> ProbeResult {
            tokio::time::sleep(self.0).await;
            ProbeResult::new(port, ProbeStatus::Closed)
        }
    }

    struct PanickyProber;

    #[async_trait]
    impl Prober for PanickyProber {
        async fn probe(&self, _target: IpAddr, port: Port, _timeout: Duration) -> ProbeResult {
            if port.as_u16() == 2 {
                panic!("boom");
            }
            ProbeResult::new(port, ProbeStatus::Open)
        }
    }

    fn scheduler(
        prober: Arc<dyn Prober>,
        concurrency: usize,
    ) -> (Scheduler, Arc<InFlightGauge>, CancellationToken) {
        let gauge = Arc::new(InFlightGauge::default());
        let cancel = CancellationToken::new();
        let scheduler = Scheduler::new(
            prober,
            LOCALHOST,
            concurrency,
            Duration::from_millis(100),
            cancel.clone(),
            Arc::clone(&gauge),
        );
        (scheduler, gauge, cancel)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ProbeResult>) -> Vec<ProbeResult> {
        let mut out = Vec::new();
        while let Ok(result) = rx.try_recv() {
            out.push(result);
        }
        out
    }

    #[test]
    fn test_gauge_tracks_peak() {
        let gauge = Arc::new(InFlightGauge::default());
        let a = gauge.enter();
        let b = gauge.enter();
        assert_eq!(gauge.current(), 2);
        drop(a);
        drop(b);
        let _c = gauge.enter();
        assert_eq!(gauge.current(), 1);
        assert_eq!(gauge.peak(), 2);
    }

    #[tokio::test]
    async fn test_one_result_per_port_within_bound() {
        let (scheduler, gauge, _cancel) =
            scheduler(Arc::new(SleepyProber(Duration::from_millis(10))), 4);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ports = PortSet::try_from_u16s(1..=40).unwrap();

        let dispatched = scheduler.run(ports, tx).await;
        let results = drain(&mut rx);

        assert_eq!(dispatched, 40);
        assert_eq!(results.len(), 40);
        let unique: HashSet<Port> = results.iter().map(|r| r.port).collect();
        assert_eq!(unique.len(), 40);
        assert!(gauge.peak() <= 4);
        assert!(gauge.peak() >= 1);
        assert_eq!(gauge.current(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_dispatches_nothing() {
        let (scheduler, _gauge, cancel) =
            scheduler(Arc::new(SleepyProber(Duration::from_millis(1))), 4);
        let (tx, mut rx) = mpsc::unbounded_channel();
        cancel.cancel();

        let dispatched = scheduler.run(PortSet::try_from_u16s(1..=10).unwrap(), tx).await;

        assert_eq!(dispatched, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_panicking_probe_only_affects_its_port() {
        let (scheduler, _gauge, _cancel) = scheduler(Arc::new(PanickyProber), 2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        scheduler.run(PortSet::try_from_u16s(1..=3).unwrap(), tx).await;
        let mut results = drain(&mut rx);
        results.sort_by_key(|r| r.port);

        let statuses: Vec<ProbeStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![ProbeStatus::Open, ProbeStatus::Error, ProbeStatus::Open]
        );
        assert_eq!(results[1].error.as_deref(), Some("probe panicked"));
    }
}
