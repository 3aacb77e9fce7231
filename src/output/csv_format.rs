//! CSV export.
//!
//! The header row and status labels are fixed: `Porta,Protocolo,Status,Serviço`
//! with `ABERTA`, `ABERTA (UDP)`, `FECHADA` and `FILTRADA`.

use crate::output::ScanReport;
use crate::scanner::{PortObservation, PortStatus};
use chrono::{DateTime, Local};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// CSV header row.
pub const CSV_HEADER: [&str; 4] = ["Porta", "Protocolo", "Status", "Serviço"];

/// Label of a status in exported files.
pub fn status_label(status: PortStatus) -> &'static str {
    match status {
        PortStatus::Open => "ABERTA",
        PortStatus::OpenUdp => "ABERTA (UDP)",
        PortStatus::Closed => "FECHADA",
        PortStatus::Filtered => "FILTRADA",
    }
}

/// Write observations as CSV to any writer.
pub fn write_csv<W: Write>(results: &[PortObservation], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(CSV_HEADER)?;
    for result in results {
        let port = result.port.to_string();
        let protocol = result.protocol.to_string();
        wtr.write_record([
            port.as_str(),
            protocol.as_str(),
            status_label(result.status),
            result.service.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print results in CSV format.
pub fn print_csv(report: &ScanReport) -> io::Result<()> {
    let stdout = io::stdout();
    write_csv(&report.results, stdout.lock()).map_err(io::Error::other)
}

/// Export results to `path`, creating missing parent directories.
pub fn export_csv(report: &ScanReport, path: &Path) -> csv::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    write_csv(&report.results, io::BufWriter::new(file))?;
    info!(path = %path.display(), rows = report.results.len(), "exported results");
    Ok(())
}

/// Generated export file name: `portscan_<target>_<YYYYmmdd_HHMMSS>.csv`,
/// with `.` and `:` in the target replaced by `_`.
pub fn default_output_filename(target: &str, now: DateTime<Local>) -> String {
    let safe_target = target.replace(['.', ':'], "_");
    format!("portscan_{}_{}.csv", safe_target, now.format("%Y%m%d_%H%M%S"))
}

/// Path used for the results of a cancelled run: `name.csv` -> `name_partial.csv`.
pub fn partial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_partial.{}", stem, ext.to_string_lossy()),
        None => format!("{}_partial", stem),
    };
    path.with_file_name(name)
}
