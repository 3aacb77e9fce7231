//! Scan command implementation.
//!
//! Runs scans through the controller, shows results live, prints the final
//! report and exports it as CSV. With `--watch` the same session keeps
//! re-running the scan on an interval until interrupted.

use crate::cli::{Args, OutputFormat};
use crate::config::AppSettings;
use crate::error::{CliError, CliResult};
use crate::output::{self, ScanReport};
use crate::scanner::{CancellationToken, ScanController, ScanEvent, ScanOutcome, ScanRequest};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// Execute a scan (or a watch loop) as described by `args`.
///
/// Configuration and resolution failures are reported to the user and turn
/// into a failing exit code; they are not returned as errors.
pub async fn execute(args: &Args, settings: &AppSettings) -> CliResult<ExitCode> {
    // Reject malformed flags before anything starts.
    args.to_request(settings)?;

    // Ctrl-C stops the current scan and any further watch cycles.
    let stop = CancellationToken::new();
    let interrupt = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.cancel();
            }
        })
    };

    let mut session = Session::new(args, settings);
    let result = match args.watch {
        Some(secs) => watch(&mut session, Duration::from_secs(secs), &stop).await,
        None => session.scan(&stop).await.map(exit_code),
    };

    interrupt.abort();
    result
}

fn exit_code(outcome: ScanOutcome) -> ExitCode {
    if outcome.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Re-run the scan every `interval` until `stop` fires, a run is cancelled
/// or fails, or the `--cycles` limit is reached.
async fn watch(
    session: &mut Session<'_>,
    interval: Duration,
    stop: &CancellationToken,
) -> CliResult<ExitCode> {
    loop {
        let outcome = session.scan(stop).await?;
        if outcome.is_error() {
            return Ok(ExitCode::FAILURE);
        }
        if outcome == ScanOutcome::Cancelled || stop.is_cancelled() {
            return Ok(ExitCode::SUCCESS);
        }
        if session.args.cycles.is_some_and(|max| session.cycles >= max) {
            return Ok(ExitCode::SUCCESS);
        }

        info!(
            cycle = session.cycles,
            next_in_secs = interval.as_secs(),
            "waiting for next scan"
        );
        tokio::select! {
            _ = stop.cancelled() => return Ok(ExitCode::SUCCESS),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// One controller and its event stream, reused by every scan of a command.
struct Session<'a> {
    args: &'a Args,
    settings: &'a AppSettings,
    controller: ScanController,
    events: UnboundedReceiver<ScanEvent>,
    /// Scans started so far.
    cycles: u64,
}

impl<'a> Session<'a> {
    fn new(args: &'a Args, settings: &'a AppSettings) -> Self {
        let controller = ScanController::new();
        let events = controller.subscribe();
        Self {
            args,
            settings,
            controller,
            events,
            cycles: 0,
        }
    }

    /// Run one scan from a fresh request and present its results.
    async fn scan(&mut self, stop: &CancellationToken) -> CliResult<ScanOutcome> {
        let request = self.args.to_request(self.settings)?;
        let format = self.args.output_format(self.settings);
        let plain = format == OutputFormat::Plain;
        let live = plain && !self.args.quiet;
        self.cycles += 1;

        if live {
            output::print_scan_header(
                &request.target,
                request.start_port,
                request.end_port,
                &request.protocols(),
            );
        }

        self.controller.configure(request.clone())?;
        let handle = self.controller.start()?;

        let progress = live.then(progress_bar);
        let mut report = ScanReport::new(&request);
        let mut cancel_sent = false;

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    report.apply(&event);
                    if let Some(pb) = &progress {
                        render(pb, &event);
                    }
                    if matches!(event, ScanEvent::Outcome(_)) {
                        break;
                    }
                }
                _ = stop.cancelled(), if !cancel_sent => {
                    self.controller.cancel();
                    cancel_sent = true;
                }
            }
        }

        let outcome = handle
            .await
            .map_err(|e| CliError::Other(format!("scan task failed: {}", e)))?;
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        debug!(%outcome, cycle = self.cycles, observations = report.results.len(), "scan task joined");

        if outcome.is_error() {
            output::print_error(&describe_failure(outcome, &request));
            return Ok(outcome);
        }

        if outcome == ScanOutcome::Cancelled {
            output::print_warning("Scan interrupted by user; results are partial.");
        }

        output::print_results(&report, format)?;
        if self.args.watch.is_some() && live {
            output::print_cycle_summary(self.cycles, &report);
        }

        if !self.args.no_export {
            export(self.args, self.settings, &report, outcome, plain)?;
        }

        Ok(outcome)
    }
}

fn render(pb: &ProgressBar, event: &ScanEvent) {
    match event {
        ScanEvent::Resolved(target) => pb.println(format!("  Scanning {}", target)),
        ScanEvent::PhaseStarted(protocol) => pb.set_message(format!("{} scan", protocol)),
        ScanEvent::Observation(observation) => pb.suspend(|| output::print_observation(observation)),
        ScanEvent::Progress(p) => pb.set_position(u64::from(p.percent)),
        ScanEvent::Outcome(_) => {}
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}",
    )
    .map(|s| s.progress_chars("=>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn describe_failure(outcome: ScanOutcome, request: &ScanRequest) -> String {
    match outcome {
        ScanOutcome::InvalidRange => format!(
            "Invalid port range {}-{} (ports must satisfy 1 <= start <= end <= 65535)",
            request.start_port, request.end_port
        ),
        ScanOutcome::NoProtocolSelected => {
            "Select at least one protocol (TCP or UDP)".to_string()
        }
        ScanOutcome::ResolutionFailed => {
            format!("Could not resolve address '{}'", request.target)
        }
        ScanOutcome::Completed | ScanOutcome::Cancelled => outcome.to_string(),
    }
}

/// Where results are exported; cancelled runs get a `_partial` suffix.
fn export_path(args: &Args, settings: &AppSettings, outcome: ScanOutcome) -> PathBuf {
    let path = args.output.clone().unwrap_or_else(|| {
        args.output_dir(settings)
            .join(output::default_output_filename(&args.target, Local::now()))
    });

    if outcome == ScanOutcome::Cancelled {
        output::partial_path(&path)
    } else {
        path
    }
}

fn export(
    args: &Args,
    settings: &AppSettings,
    report: &ScanReport,
    outcome: ScanOutcome,
    plain: bool,
) -> CliResult<()> {
    if outcome == ScanOutcome::Cancelled && report.results.is_empty() {
        return Ok(());
    }

    let path = export_path(args, settings, outcome);
    output::export_csv(report, &path)?;
    if plain && !args.quiet {
        output::print_success(&format!("Results exported to {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_export_path() {
        let settings = AppSettings::default();

        let args = Args::parse_from(["portmapp", "host", "-o", "out/scan.csv"]);
        assert_eq!(
            export_path(&args, &settings, ScanOutcome::Completed),
            PathBuf::from("out/scan.csv")
        );
        assert_eq!(
            export_path(&args, &settings, ScanOutcome::Cancelled),
            PathBuf::from("out/scan_partial.csv")
        );

        let args = Args::parse_from(["portmapp", "10.0.0.1", "--output-dir", "reports"]);
        let path = export_path(&args, &settings, ScanOutcome::Completed);
        assert!(path.starts_with("reports"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("portscan_10_0_0_1_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn test_describe_failure() {
        let request = ScanRequest::new("nowhere.invalid", 5, 1);
        assert!(describe_failure(ScanOutcome::InvalidRange, &request).contains("5-1"));
        assert!(describe_failure(ScanOutcome::ResolutionFailed, &request)
            .contains("nowhere.invalid"));
    }

    #[tokio::test]
    async fn test_invalid_range_exits_with_failure() {
        let args = Args::parse_from(["portmapp", "127.0.0.1", "-p", "9-3", "-q", "--no-export"]);
        let code = execute(&args, &AppSettings::default()).await.unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_watch_reruns_until_cycle_limit() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("watch.csv");

        let args = Args::parse_from([
            "portmapp",
            "127.0.0.1",
            "-p",
            &port,
            "-q",
            "-f",
            "json",
            "-o",
            file.to_str().unwrap(),
            "--watch",
            "0",
            "--cycles",
            "3",
        ]);
        let settings = AppSettings::default();
        let mut session = Session::new(&args, &settings);

        let code = watch(&mut session, Duration::ZERO, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(session.cycles, 3);
        assert!(!session.controller.is_running());

        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.contains(&format!("{},TCP,ABERTA,", port)));
    }

    #[tokio::test]
    async fn test_watch_stops_while_waiting() {
        let args = Args::parse_from([
            "portmapp", "127.0.0.1", "-p", "1", "-q", "-f", "json", "--no-export", "--watch",
            "3600",
        ]);
        let settings = AppSettings::default();
        let mut session = Session::new(&args, &settings);

        let stop = CancellationToken::new();
        {
            let stop = stop.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                stop.cancel();
            });
        }

        let code = tokio::time::timeout(
            Duration::from_secs(10),
            watch(&mut session, Duration::from_secs(3600), &stop),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(session.cycles, 1);
    }

    #[tokio::test]
    async fn test_watch_stops_on_failed_scan() {
        let args = Args::parse_from([
            "portmapp", "127.0.0.1", "-p", "9-3", "-q", "--no-export", "--watch", "0",
        ]);
        let settings = AppSettings::default();
        let mut session = Session::new(&args, &settings);

        let code = watch(&mut session, Duration::ZERO, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(session.cycles, 1);
    }

    #[tokio::test]
    async fn test_stop_cancels_running_scan() {
        let args = Args::parse_from([
            "portmapp", "127.0.0.1", "-p", "1-65535", "-q", "-f", "json", "--no-export",
        ]);
        let settings = AppSettings::default();
        let mut session = Session::new(&args, &settings);

        let stop = CancellationToken::new();
        stop.cancel();
        let outcome = session.scan(&stop).await.unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_scan_exports_csv() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("result.csv");

        let args = Args::parse_from([
            "portmapp",
            "127.0.0.1",
            "-p",
            &port,
            "-q",
            "-f",
            "json",
            "-o",
            file.to_str().unwrap(),
        ]);
        let code = execute(&args, &AppSettings::default()).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.contains(&format!("{},TCP,ABERTA,", port)));
    }
}
