//! JSON output formatting.

use crate::config::ResultFilter;
use crate::scanner::{ProbeResult, ProbeStatus, ScanReport, SessionState};
use crate::types::{SessionId, Target};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Counts {
    open: usize,
    closed: usize,
    filtered: usize,
    error: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    session_id: SessionId,
    target: &'a Target,
    state: SessionState,
    requested: usize,
    completed: usize,
    counts: Counts,
    peak_in_flight: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_ms: u64,
    results: Vec<&'a ProbeResult>,
}

/// Write the report as pretty-printed JSON.
pub fn write_json<W: Write>(
    out: &mut W,
    report: &ScanReport,
    filter: &ResultFilter,
) -> io::Result<()> {
    let view = JsonReport {
        session_id: report.session_id,
        target: &report.target,
        state: report.state,
        requested: report.requested,
        completed: report.len(),
        counts: Counts {
            open: report.count(ProbeStatus::Open),
            closed: report.count(ProbeStatus::Closed),
            filtered: report.count(ProbeStatus::Filtered),
            error: report.count(ProbeStatus::Error),
        },
        peak_in_flight: report.peak_in_flight,
        started_at: report.started_at,
        finished_at: report.finished_at,
        duration_ms: report.duration_ms,
        results: report.sorted().filter(|r| filter.accepts(r)).collect(),
    };

    serde_json::to_writer_pretty(&mut *out, &view).map_err(io::Error::other)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::sample_report;

    #[test]
    fn test_json_counts_everything_lists_filtered() {
        let mut buf = Vec::new();
        write_json(&mut buf, &sample_report(), &ResultFilter::OpenOnly).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(json["state"], "completed");
        assert_eq!(json["completed"], 4);
        assert_eq!(json["counts"]["filtered"], 1);
        assert_eq!(json["target"]["ip"], "127.0.0.1");
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["port"], 22);
        assert_eq!(results[0]["status"], "open");
    }
}
