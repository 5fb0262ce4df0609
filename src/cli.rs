//! Command-line interface definitions for portsweep.
//!
//! Uses `clap` derive macros for declarative argument parsing. Flags left
//! unset fall back to the user's [`AppSettings`].

use crate::config::{AppSettings, ResultFilter, ScanConfig};
use crate::scanner::ProbeStatus;
use crate::types::{PortError, PortSet};
use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A bounded-concurrency TCP connect port scanner.
///
/// Only scan hosts you are authorized to test.
#[derive(Parser, Debug)]
#[command(name = "portsweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A fast TCP connect port scanner", long_about = None)]
pub struct Args {
    /// Target IP address or hostname to scan
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to scan (e.g., "80", "80,443", "1-1024", "22,80,443,8000-9000", "top100", "all")
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Maximum number of probes in flight at once
    #[arg(short = 'c', long, env = "PORTSWEEP_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Per-probe connect timeout in milliseconds
    #[arg(short = 't', long, env = "PORTSWEEP_TIMEOUT_MS")]
    pub timeout: Option<u64>,

    /// Include closed, filtered and error results, not just open ports
    #[arg(short, long)]
    pub verbose: bool,

    /// Only list results with these statuses (overrides --verbose)
    #[arg(long, value_enum, value_delimiter = ',', value_name = "STATUS")]
    pub show: Vec<StatusArg>,

    /// Output format for results
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Suppress the header and progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a settings file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,
}

impl Args {
    pub fn port_set(&self, settings: &AppSettings) -> Result<PortSet, PortError> {
        self.ports
            .as_deref()
            .unwrap_or(&settings.default_ports)
            .parse()
    }

    /// Which results get streamed and listed.
    pub fn result_filter(&self, settings: &AppSettings) -> ResultFilter {
        if !self.show.is_empty() {
            ResultFilter::Statuses(self.show.iter().copied().map(ProbeStatus::from).collect())
        } else if self.verbose || settings.verbose {
            ResultFilter::All
        } else {
            ResultFilter::OpenOnly
        }
    }

    pub fn scan_config(&self, settings: &AppSettings) -> ScanConfig {
        ScanConfig::new()
            .with_concurrency(self.concurrency.unwrap_or(settings.default_concurrency))
            .with_timeout(Duration::from_millis(
                self.timeout.unwrap_or(settings.default_timeout_ms),
            ))
            .with_filter(self.result_filter(settings))
    }

    pub fn output_format(&self, settings: &AppSettings) -> OutputFormat {
        self.output.unwrap_or_else(|| {
            OutputFormat::from_str(&settings.default_output_format, true).unwrap_or_default()
        })
    }
}

/// Probe statuses selectable with `--show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Open,
    Closed,
    Filtered,
    Error,
}

impl From<StatusArg> for ProbeStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Open => Self::Open,
            StatusArg::Closed => Self::Closed,
            StatusArg::Filtered => Self::Filtered,
            StatusArg::Error => Self::Error,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text, streamed as results arrive
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
