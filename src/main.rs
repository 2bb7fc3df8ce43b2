use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use portscan_rs::scanner::{self, ScanTarget};
use portscan_rs::server::{self, ServerConfig};
use portscan_rs::types::ScanResult;
use portscan_rs::{output, ports};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// portscan-rs — concurrent TCP connect port scanner with banner grabbing.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "portscan-rs",
    version,
    about = "Concurrent TCP connect port scanner with banner grabbing and a small web UI.",
    long_about = None
)]
struct Cli {
    /// Target IP address or host name. Required unless --serve-ui is given.
    #[arg(long)]
    target: Option<String>,

    /// Ports to scan, e.g. `80`, `22-100`, `22,80,443,8000-8100`.
    #[arg(long, default_value = ports::DEFAULT_PORT_SPEC)]
    ports: String,

    /// Max concurrent TCP connect attempts.
    #[arg(long, default_value_t = scanner::DEFAULT_CONCURRENCY)]
    threads: usize,

    /// Connect timeout per attempt (`2s`, `500ms`, `1m`, or seconds).
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    timeout: Duration,

    /// Write all results as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run the HTTP front end instead of a one-shot scan.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    /// Address the HTTP front end listens on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Directory of static assets served by the HTTP front end.
    #[arg(long = "static-dir", default_value = "web/static")]
    static_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.serve_ui {
        let config = ServerConfig {
            bind: cli.bind,
            static_dir: cli.static_dir,
            concurrency: cli.threads,
            timeout: cli.timeout,
        };
        return server::spawn_server(config).await;
    }

    let (target, port_list) = prepare(&cli).await?;

    output::print_header(&target.host, port_list.len());

    // Ctrl-C stops admitting new attempts and reports what finished.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    let start = Instant::now();
    let mut results = scanner::scan_with_cancel(&target, &port_list, cancel.clone()).await;
    let elapsed = start.elapsed();

    results.sort_by_key(|r| r.port);
    for result in &results {
        output::print_result(result);
    }
    if cancel.is_cancelled() {
        eprintln!(
            "Scan interrupted: {} of {} ports completed",
            results.len(),
            port_list.len()
        );
    }
    output::print_summary(&results, elapsed);

    if let Some(path) = cli.output.as_deref() {
        write_results_json(path, &results)?;
        println!("Wrote JSON results to {}", path.display());
    }

    Ok(())
}

/// Validate the target and port spec before any connection is attempted.
async fn prepare(cli: &Cli) -> Result<(ScanTarget, Vec<u16>)> {
    let Some(host) = cli.target.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        bail!("--target flag is required");
    };

    scanner::resolve_target(host)
        .await
        .with_context(|| format!("invalid target '{host}'"))?;

    let port_list = ports::resolve(&cli.ports).context("error parsing ports")?;
    if port_list.is_empty() {
        bail!("no valid ports to scan");
    }

    let target = ScanTarget::new(host)
        .with_timeout(cli.timeout)
        .with_concurrency(cli.threads);
    Ok((target, port_list))
}

fn write_results_json(path: &Path, results: &[ScanResult]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, results)
        .with_context(|| format!("failed to write JSON to {}", path.display()))?;
    Ok(())
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (num, millis_per_unit) = if let Some(v) = s.strip_suffix("ms") {
        (v, 1.0)
    } else if let Some(v) = s.strip_suffix('s') {
        (v, 1_000.0)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60_000.0)
    } else {
        (s, 1_000.0)
    };
    let value: f64 = num
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;
    Duration::try_from_secs_f64(value * millis_per_unit / 1_000.0)
        .map_err(|_| format!("invalid duration: {s}"))
}
