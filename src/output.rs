//! Console rendering of scan results for the CLI.
use crate::types::ScanResult;
use colored::Colorize;
use std::time::Duration;
use time::{format_description::well_known, OffsetDateTime};

const BANNER_WIDTH: usize = 40;

pub fn print_header(target: &str, port_count: usize) {
    println!("{}", "portscan-rs v0.1".cyan());
    println!("{}", "----------------------------".cyan());
    println!("Target: {target}");
    println!("Scanning {port_count} ports...");
    println!("Started at: {}", now_rfc2822());
    println!();
}

/// Print an open port line; closed ports are not printed.
pub fn print_result(result: &ScanResult) {
    if !result.is_open() {
        return;
    }
    let line = if result.service.is_empty() {
        format!("Port {:>5}: {}", result.port, result.state)
    } else {
        format!(
            "Port {:>5}: {:<6}  {}",
            result.port,
            result.state,
            banner_snippet(&result.service)
        )
    };
    println!("{}", line.green());
}

pub fn print_summary(results: &[ScanResult], elapsed: Duration) {
    let open = results.iter().filter(|r| r.is_open()).count();
    println!();
    println!("{}", format!("Scan completed in {elapsed:.3?}").cyan());
    println!(
        "Results: {} ports scanned, {} open ports",
        results.len(),
        open
    );
    if open == 0 {
        println!("{}", "No open ports found.".yellow());
    }
}

/// Single-line form of a banner, cut to 40 characters.
pub fn banner_snippet(banner: &str) -> String {
    let flat: String = banner
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= BANNER_WIDTH {
        return flat;
    }
    let mut cut: String = flat.chars().take(BANNER_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}

fn now_rfc2822() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc2822)
        .unwrap_or_else(|_| String::from("unknown"))
}
