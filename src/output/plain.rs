//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::output::ScanReport;
use crate::scanner::{PortObservation, PortStatus, Protocol};
use chrono::Local;
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

fn status_style(status: PortStatus) -> Style {
    match status {
        PortStatus::Open | PortStatus::OpenUdp => Style::new().green().bold(),
        PortStatus::Closed => Style::new().red(),
        PortStatus::Filtered => Style::new().yellow(),
    }
}

/// Live line for one observation. Closed ports are not shown.
pub fn observation_line(observation: &PortObservation) -> Option<String> {
    if observation.status == PortStatus::Closed {
        return None;
    }
    let status = status_style(observation.status).apply_to(format!("{:<12}", observation.status));
    Some(format!(
        "  {:>5}/{:<3}  {}  {}",
        observation.port, observation.protocol, status, observation.service
    ))
}

/// Print one observation as it arrives.
pub fn print_observation(observation: &PortObservation) {
    if let Some(line) = observation_line(observation) {
        println!("{}", line);
    }
}

/// Print the end-of-run summary in human-readable plain text format.
pub fn print_plain(report: &ScanReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out, "                    {} Scan Summary", style("portmapp").cyan().bold())?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    writeln!(out, "  {} {}", style("Target:").bold(), report.target)?;
    if let Some(ip) = &report.ip_address {
        writeln!(out, "  {} {}", style("IP Address:").bold(), ip)?;
    }
    if let Some(outcome) = report.outcome {
        writeln!(out, "  {} {}", style("Outcome:").bold(), outcome)?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "  {} {} probes in {:.2}s",
        style("Statistics:").bold(),
        report.results.len(),
        report.duration_ms() as f64 / 1000.0
    )?;
    writeln!(
        out,
        "               {} open, {} filtered, {} closed",
        style(report.open_ports).green().bold(),
        style(report.filtered_ports).yellow(),
        style(report.closed_ports).red()
    )?;
    writeln!(out)?;

    let open: Vec<&PortObservation> = report.open_results().collect();
    if open.is_empty() {
        writeln!(out, "  {}", style("No open ports found.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:>9}  {:<12}  {}",
            style("PORT").bold(),
            style("STATE").bold(),
            style("SERVICE").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for result in open {
            writeln!(
                out,
                "  {:>5}/{:<3}  {}  {}",
                result.port,
                result.protocol,
                status_style(result.status).apply_to(format!("{:<12}", result.status)),
                result.service
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
pub fn print_scan_header(target: &str, start_port: u16, end_port: u16, protocols: &[Protocol]) {
    let protocols = protocols
        .iter()
        .map(Protocol::to_string)
        .collect::<Vec<_>>()
        .join(" + ");

    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("portmapp").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Protocols: {}", style("•").dim(), style(protocols).yellow());
    println!("{} Target: {}", style("•").dim(), style(target).white().bold());
    println!(
        "{} Ports: {}-{}  (Ctrl+C to stop)",
        style("•").dim(),
        start_port,
        end_port
    );
    println!();
}

/// One line per finished watch cycle.
pub fn print_cycle_summary(cycle: u64, report: &ScanReport) {
    println!(
        "{} {} {}",
        style(format!("[scan #{}]", cycle)).cyan(),
        style(Local::now().format("%H:%M:%S")).dim(),
        report.summary()
    );
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}
