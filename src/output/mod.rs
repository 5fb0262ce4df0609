//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output of scan reports.
//! Counts always cover every result; the filter only decides which rows are
//! listed.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::write_csv;
pub use json_format::write_json;
pub use plain::{format_result_line, print_error, print_scan_header, print_warning, write_plain};

use crate::cli::OutputFormat;
use crate::config::ResultFilter;
use crate::scanner::ScanReport;
use std::io;

/// Format and print a final report to stdout.
pub fn print_report(
    report: &ScanReport,
    format: OutputFormat,
    filter: &ResultFilter,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Plain => write_plain(&mut out, report, filter),
        OutputFormat::Json => write_json(&mut out, report, filter),
        OutputFormat::Csv => write_csv(&mut out, report, filter),
    }
}
