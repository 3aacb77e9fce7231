//! Output formatting module.
//!
//! Front-end helpers that turn scan events and the retained [`ScanReport`]
//! into plain text, JSON, or CSV.

mod csv_format;
mod json_format;
mod plain;
mod report;

pub use csv_format::{
    default_output_filename, export_csv, partial_path, print_csv, status_label, write_csv,
};
pub use json_format::print_json;
pub use plain::{
    print_cycle_summary, print_error, print_observation, print_plain, print_scan_header,
    print_success, print_warning,
};
pub use report::ScanReport;

use crate::cli::OutputFormat;
use std::io;

/// Format and print the final report according to the specified format.
pub fn print_results(report: &ScanReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_plain(report),
        OutputFormat::Json => json_format::print_json(report),
        OutputFormat::Csv => csv_format::print_csv(report),
    }
}
