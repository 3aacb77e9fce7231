//! Command-line interface definitions for portmapp.
//!
//! Uses `clap` derive macros for declarative argument parsing. The front-end is
//! a thin adapter: it builds a [`ScanRequest`], drives a
//! [`ScanController`](crate::scanner::ScanController) and renders its events.

mod scan;

pub use scan::execute;

use crate::config::AppSettings;
use crate::error::CliResult;
use crate::scanner::ScanRequest;
use crate::types::parse_port_bounds;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A TCP/UDP port scanner.
#[derive(Parser, Debug)]
#[command(name = "portmapp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan a range of TCP/UDP ports on one host", long_about = None)]
pub struct Args {
    /// Target IP address or hostname to scan
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to scan (e.g., "80", "1-1000", "22,80,443" scans 22 through 443)
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Scan TCP ports (on unless disabled in settings)
    #[arg(short = 't', long)]
    pub tcp: bool,

    /// Do not scan TCP ports
    #[arg(long, conflicts_with = "tcp")]
    pub no_tcp: bool,

    /// Scan UDP ports
    #[arg(short = 'u', long)]
    pub udp: bool,

    /// Per-probe timeout in milliseconds
    #[arg(short = 'T', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// CSV file to export results to (may include a directory)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for the generated CSV file name
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Format of the final report printed to stdout
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Do not write a CSV file
    #[arg(long)]
    pub no_export: bool,

    /// Keep monitoring: re-run the scan every SECS seconds until Ctrl+C
    #[arg(short = 'w', long, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Stop watching after N scans
    #[arg(long, value_name = "N", requires = "watch")]
    pub cycles: Option<u64>,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress live results and the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a settings file
    #[arg(long, value_name = "PATH", env = "PORTMAPP_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Build the scan request from flags, falling back to `settings`.
    pub fn to_request(&self, settings: &AppSettings) -> CliResult<ScanRequest> {
        let ports = self.ports.as_deref().unwrap_or(&settings.ports);
        let (start, end) = parse_port_bounds(ports)?;

        let tcp = (settings.tcp || self.tcp) && !self.no_tcp;
        let udp = settings.udp || self.udp;

        Ok(ScanRequest::new(self.target.clone(), start, end)
            .with_tcp(tcp)
            .with_udp(udp)
            .with_timeout_ms(self.timeout.unwrap_or(settings.timeout_ms)))
    }

    /// Report format, falling back to `settings`.
    pub fn output_format(&self, settings: &AppSettings) -> OutputFormat {
        self.format.unwrap_or(settings.output_format)
    }

    /// Directory for generated export names, falling back to `settings`.
    pub fn output_dir(&self, settings: &AppSettings) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| settings.output_dir.clone())
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable plain text
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("portmapp").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_from_settings() {
        let args = parse(&["example.com"]);
        let request = args.to_request(&AppSettings::default()).unwrap();
        assert_eq!(request.target, "example.com");
        assert_eq!((request.start_port, request.end_port), (1, 1000));
        assert!(request.scan_tcp);
        assert!(!request.scan_udp);
        assert_eq!(request.timeout_ms, 1000);
    }

    #[test]
    fn test_flags_override_settings() {
        let args = parse(&["10.0.0.1", "-p", "22,80,443", "-u", "--no-tcp", "-T", "250"]);
        let request = args.to_request(&AppSettings::default()).unwrap();
        assert_eq!((request.start_port, request.end_port), (22, 443));
        assert!(!request.scan_tcp);
        assert!(request.scan_udp);
        assert_eq!(request.timeout_ms, 250);
    }

    #[test]
    fn test_inverted_range_passes_through() {
        let args = parse(&["host", "-p", "5-1"]);
        let request = args.to_request(&AppSettings::default()).unwrap();
        assert_eq!((request.start_port, request.end_port), (5, 1));
    }

    #[test]
    fn test_bad_ports() {
        let args = parse(&["host", "-p", "http"]);
        assert!(matches!(
            args.to_request(&AppSettings::default()),
            Err(CliError::Port(_))
        ));
    }

    #[test]
    fn test_tcp_conflicts_with_no_tcp() {
        let result = Args::try_parse_from(["portmapp", "host", "--tcp", "--no-tcp"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch_flags() {
        let args = parse(&["host", "--watch", "30", "--cycles", "2"]);
        assert_eq!(args.watch, Some(30));
        assert_eq!(args.cycles, Some(2));

        assert!(parse(&["host"]).watch.is_none());
        assert!(Args::try_parse_from(["portmapp", "host", "--cycles", "2"]).is_err());
    }

    #[test]
    fn test_output_settings() {
        let settings = AppSettings {
            output_format: OutputFormat::Json,
            ..AppSettings::default()
        };
        let args = parse(&["host"]);
        assert_eq!(args.output_format(&settings), OutputFormat::Json);
        assert_eq!(args.output_dir(&settings), PathBuf::from("."));

        let args = parse(&["host", "-f", "csv", "--output-dir", "out"]);
        assert_eq!(args.output_format(&settings), OutputFormat::Csv);
        assert_eq!(args.output_dir(&settings), PathBuf::from("out"));
    }
}
