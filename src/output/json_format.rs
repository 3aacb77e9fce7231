//! JSON output formatting.

use crate::output::ScanReport;
use std::io;

/// Print the report as pretty JSON.
pub fn print_json(report: &ScanReport) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}
