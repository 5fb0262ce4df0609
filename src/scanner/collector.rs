//! Result collection.
//!
//! The collector is the single owner of a session's result map. Workers hand
//! results to it over a channel; it records each one, bumps the live
//! completion counter, and forwards the ones the caller's filter accepts to
//! the [`ResultStream`].

use crate::config::ResultFilter;
use crate::scanner::session::SessionState;
use crate::scanner::traits::{ProbeResult, ProbeStatus};
use crate::types::{Port, SessionId, Target};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::warn;

/// Lazy, single-pass stream of results in completion order.
///
/// The stream ends once the session reaches a terminal state. It cannot be
/// restarted; use [`ScanReport`] for random access afterwards.
#[derive(Debug)]
pub struct ResultStream {
    rx: mpsc::UnboundedReceiver<ProbeResult>,
}

impl ResultStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<ProbeResult>) -> Self {
        Self { rx }
    }
}

impl Stream for ResultStream {
    type Item = ProbeResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

pub(crate) struct Collector {
    results: BTreeMap<Port, ProbeResult>,
    completed: Arc<AtomicUsize>,
    filter: ResultFilter,
    forward: mpsc::UnboundedSender<ProbeResult>,
}

impl Collector {
    pub(crate) fn new(
        filter: ResultFilter,
        completed: Arc<AtomicUsize>,
        forward: mpsc::UnboundedSender<ProbeResult>,
    ) -> Self {
        Self {
            results: BTreeMap::new(),
            completed,
            filter,
            forward,
        }
    }

    /// Consume results until every worker has dropped its sender.
    pub(crate) async fn run(
        mut self,
        mut incoming: mpsc::UnboundedReceiver<ProbeResult>,
    ) -> BTreeMap<Port, ProbeResult> {
        while let Some(result) = incoming.recv().await {
            self.record(result);
        }
        self.results
    }

    fn record(&mut self, result: ProbeResult) {
        if self.results.contains_key(&result.port) {
            warn!(port = %result.port, "duplicate result ignored");
            return;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.filter.accepts(&result) {
            // The caller may have dropped the stream; the map still gets the result.
            let _ = self.forward.send(result.clone());
        }
        self.results.insert(result.port, result);
    }
}

/// Final status map of a session that got past resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub session_id: SessionId,
    pub target: Target,
    /// `Completed` or `Cancelled`.
    pub state: SessionState,
    /// Number of ports the session was asked to probe.
    pub requested: usize,
    /// Highest number of probes observed in flight at once.
    pub peak_in_flight: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Every result, keyed by port.
    #[serde(serialize_with = "results_as_list")]
    pub results: BTreeMap<Port, ProbeResult>,
}

impl ScanReport {
    pub fn get(&self, port: Port) -> Option<&ProbeResult> {
        self.results.get(&port)
    }

    /// Results in ascending port order.
    pub fn sorted(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, status: ProbeStatus) -> usize {
        self.results.values().filter(|r| r.status == status).count()
    }

    pub fn open_ports(&self) -> Vec<Port> {
        self.results
            .values()
            .filter(|r| r.is_open())
            .map(|r| r.port)
            .collect()
    }

    /// One-line summary for logs and footers.
    pub fn summary(&self) -> String {
        format!(
            "{} - {}/{} ports, {} open, {} closed, {} filtered, {} error [{:.2}s]",
            self.target,
            self.len(),
            self.requested,
            self.count(ProbeStatus::Open),
            self.count(ProbeStatus::Closed),
            self.count(ProbeStatus::Filtered),
            self.count(ProbeStatus::Error),
            self.duration_ms as f64 / 1000.0
        )
    }
}

fn results_as_list<S: Serializer>(
    results: &BTreeMap<Port, ProbeResult>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(results.values())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn port(n: u16) -> Port {
        Port::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_filter_limits_stream_but_not_map() {
        let completed = Arc::new(AtomicUsize::new(0));
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::unbounded_channel();
        let collector = Collector::new(ResultFilter::OpenOnly, Arc::clone(&completed), forward_tx);

        tx.send(ProbeResult::new(port(22), ProbeStatus::Open)).unwrap();
        tx.send(ProbeResult::new(port(23), ProbeStatus::Closed)).unwrap();
        tx.send(ProbeResult::new(port(24), ProbeStatus::Filtered)).unwrap();
        drop(tx);

        let map = collector.run(rx).await;
        let streamed: Vec<ProbeResult> = ResultStream::new(forward_rx).collect().await;

        assert_eq!(map.len(), 3);
        assert_eq!(completed.load(Ordering::SeqCst), 3);
        assert_eq!(streamed.len(), 1);
        assert_eq!(streamed[0].port, port(22));
    }

    #[tokio::test]
    async fn test_duplicate_port_recorded_once() {
        let completed = Arc::new(AtomicUsize::new(0));
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::unbounded_channel();
        let collector = Collector::new(ResultFilter::All, Arc::clone(&completed), forward_tx);

        tx.send(ProbeResult::new(port(80), ProbeStatus::Open)).unwrap();
        tx.send(ProbeResult::new(port(80), ProbeStatus::Closed)).unwrap();
        drop(tx);

        let map = collector.run(rx).await;
        let streamed: Vec<ProbeResult> = ResultStream::new(forward_rx).collect().await;

        assert_eq!(map[&port(80)].status, ProbeStatus::Open);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(streamed.len(), 1);
    }

    #[tokio::test]
    async fn test_collector_survives_dropped_stream() {
        let completed = Arc::new(AtomicUsize::new(0));
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        drop(forward_rx);
        let (tx, rx) = mpsc::unbounded_channel();
        let collector = Collector::new(ResultFilter::All, completed, forward_tx);

        tx.send(ProbeResult::new(port(443), ProbeStatus::Open)).unwrap();
        drop(tx);

        assert_eq!(collector.run(rx).await.len(), 1);
    }

    #[test]
    fn test_report_helpers_and_json() {
        let mut results = BTreeMap::new();
        for (n, status) in [
            (9999, ProbeStatus::Closed),
            (22, ProbeStatus::Open),
            (80, ProbeStatus::Filtered),
        ] {
            results.insert(port(n), ProbeResult::new(port(n), status));
        }
        let now = Utc::now();
        let report = ScanReport {
            session_id: SessionId::new(),
            target: Target::from(std::net::IpAddr::from([127, 0, 0, 1])),
            state: SessionState::Completed,
            requested: 3,
            peak_in_flight: 3,
            started_at: now,
            finished_at: now,
            duration_ms: 12,
            results,
        };

        assert_eq!(report.open_ports(), vec![port(22)]);
        assert_eq!(report.count(ProbeStatus::Closed), 1);
        let order: Vec<u16> = report.sorted().map(|r| r.port.as_u16()).collect();
        assert_eq!(order, vec![22, 80, 9999]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["results"].as_array().unwrap().len(), 3);
        assert_eq!(json["results"][0]["port"], 22);
    }
}
