use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use portsweep::cli::{Args, OutputFormat};
use portsweep::config::AppSettings;
use portsweep::output;
use portsweep::scanner::{ScanSession, SessionState};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portsweep={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AppSettings::load().context("loading settings")?,
    };

    let ports = args
        .port_set(&settings)
        .context("invalid port specification")?;
    let config = args.scan_config(&settings);
    let filter = config.filter.clone();
    let format = args.output_format(&settings);
    let streaming = format == OutputFormat::Plain;

    if streaming && !args.quiet {
        output::print_scan_header(&args.target, ports.len(), config.concurrency, config.timeout);
    }

    let (handle, mut results) = ScanSession::new(args.target.clone(), ports, config).start()?;

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::print_warning("interrupted, waiting for in-flight probes to finish");
            cancel.cancel();
        }
    });

    let progress = progress_bar(handle.requested() as u64, streaming && !args.quiet);
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            next = results.next() => match next {
                Some(result) if streaming => {
                    let line = output::format_result_line(&result);
                    if progress.is_hidden() {
                        println!("{}", line);
                    } else {
                        progress.println(line);
                    }
                }
                Some(_) => {}
                None => break,
            },
            _ = tick.tick() => progress.set_position(handle.completed() as u64),
        }
    }
    progress.finish_and_clear();

    let report = handle
        .await_completion()
        .await
        .with_context(|| format!("scan of {} failed", args.target))?;

    if report.state == SessionState::Cancelled {
        output::print_warning(&format!(
            "scan cancelled after {} of {} ports",
            report.len(),
            report.requested
        ));
    }

    output::print_report(&report, format, &filter).context("writing results")?;
    Ok(())
}

fn progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    pb
}
