//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::config::ResultFilter;
use crate::scanner::{ProbeResult, ProbeStatus, ScanReport};
use console::{style, Style};
use std::io::{self, Write};
use std::time::Duration;

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

fn status_style(status: ProbeStatus) -> Style {
    match status {
        ProbeStatus::Open => Style::new().green().bold(),
        ProbeStatus::Closed => Style::new().red(),
        ProbeStatus::Filtered => Style::new().yellow(),
        ProbeStatus::Error => Style::new().magenta(),
    }
}

fn latency_display(result: &ProbeResult) -> String {
    result
        .latency_ms
        .map(|ms| format!("{:.1}ms", ms))
        .unwrap_or_default()
}

/// One line for a result as it streams in.
pub fn format_result_line(result: &ProbeResult) -> String {
    let mut line = format!(
        "  {:>6}/tcp  {}",
        result.port,
        status_style(result.status).apply_to(format!("{:<8}", result.status))
    );
    let latency = latency_display(result);
    if !latency.is_empty() {
        line.push_str(&format!("  {}", style(latency).dim()));
    }
    if let Some(reason) = &result.error {
        line.push_str(&format!("  {}", style(reason).dim()));
    }
    line
}

/// Write the final summary table.
pub fn write_plain<W: Write>(
    out: &mut W,
    report: &ScanReport,
    filter: &ResultFilter,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                    {} Scan Results",
        style("portsweep").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    writeln!(out, "  {} {}", style("Target:").bold(), report.target)?;
    writeln!(
        out,
        "  {} {}",
        style("Session:").bold(),
        style(report.session_id.short()).dim()
    )?;
    writeln!(out, "  {} {}", style("State:").bold(), report.state)?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {}/{} ports probed in {:.2}s (peak {} in flight)",
        style("Statistics:").bold(),
        report.len(),
        report.requested,
        report.duration_ms as f64 / 1000.0,
        report.peak_in_flight
    )?;
    writeln!(
        out,
        "              {} open, {} closed, {} filtered, {} error",
        style(report.count(ProbeStatus::Open)).green().bold(),
        style(report.count(ProbeStatus::Closed)).red(),
        style(report.count(ProbeStatus::Filtered)).yellow(),
        style(report.count(ProbeStatus::Error)).magenta()
    )?;
    writeln!(out)?;

    let rows: Vec<&ProbeResult> = report.sorted().filter(|r| filter.accepts(r)).collect();
    if rows.is_empty() {
        writeln!(out, "  {}", style("No ports to display.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:>6}  {:<10}  {:>10}  {}",
            style("PORT").bold(),
            style("STATE").bold(),
            style("LATENCY").bold(),
            style("DETAIL").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for result in rows {
            writeln!(
                out,
                "  {:>6}  {:<10}  {:>10}  {}",
                result.port,
                status_style(result.status).apply_to(result.status.to_string()),
                latency_display(result),
                style(result.error.as_deref().unwrap_or_default()).dim()
            )?;
        }

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, ports: usize, concurrency: usize, timeout: Duration) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portsweep").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Target: {}", style("•").dim(), style(target).white().bold());
    println!(
        "{} Probing {} ports, {} at a time, {}ms timeout",
        style("•").dim(),
        style(ports).white().bold(),
        concurrency,
        timeout.as_millis()
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}
