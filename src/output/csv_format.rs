//! CSV output formatting.

use crate::config::ResultFilter;
use crate::scanner::ScanReport;
use std::io::{self, Write};

/// Write one row per listed result, ascending by port.
pub fn write_csv<W: Write>(
    out: &mut W,
    report: &ScanReport,
    filter: &ResultFilter,
) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["port", "status", "latency_ms", "error"])?;

    for result in report.sorted().filter(|r| filter.accepts(r)) {
        let latency = result
            .latency_ms
            .map_or(String::new(), |ms| format!("{:.3}", ms));
        wtr.write_record([
            result.port.to_string().as_str(),
            result.status.to_string().as_str(),
            latency.as_str(),
            result.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
