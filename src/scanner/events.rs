//! Events a scan run pushes to its subscribers.
//!
//! A run emits `Resolved`, then per phase a `PhaseStarted` followed by
//! `Observation`/`Progress` pairs, and always ends with exactly one `Outcome`.

use crate::scanner::controller::RunRelease;
use crate::scanner::traits::{PortObservation, Protocol};
use crate::types::ScanTarget;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

/// Completion percentage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Integer percentage in `0..=100`.
    pub percent: u8,
    /// Probes finished so far.
    pub scanned: usize,
    /// Probes planned for the run.
    pub total: usize,
}

impl ScanProgress {
    /// Progress after `scanned` of `total` probes.
    pub fn new(scanned: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            (scanned.min(total) as u64 * 100 / total as u64) as u8
        };
        Self {
            percent,
            scanned,
            total,
        }
    }

    /// Terminal progress, reported as 100% even if the run stopped early.
    pub fn finished(scanned: usize, total: usize) -> Self {
        Self {
            percent: 100,
            scanned,
            total,
        }
    }
}

impl fmt::Display for ScanProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% ({}/{})", self.percent, self.scanned, self.total)
    }
}

/// Terminal result of a whole scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Every planned probe ran.
    Completed,
    /// Stopped early on request; observations already emitted stand.
    Cancelled,
    /// Start port above end port, or a bound outside 1-65535.
    InvalidRange,
    /// Neither TCP nor UDP was requested.
    NoProtocolSelected,
    /// The target could not be resolved to an address.
    ResolutionFailed,
}

impl ScanOutcome {
    /// Whether the run was short-circuited before any probing.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::InvalidRange | Self::NoProtocolSelected | Self::ResolutionFailed
        )
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "scan completed"),
            Self::Cancelled => write!(f, "scan cancelled"),
            Self::InvalidRange => write!(f, "invalid port range"),
            Self::NoProtocolSelected => write!(f, "no protocol selected"),
            Self::ResolutionFailed => write!(f, "could not resolve target"),
        }
    }
}

/// One event of a scan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// The target resolved; all probes of the run use this address.
    Resolved(ScanTarget),
    /// A protocol phase is starting.
    PhaseStarted(Protocol),
    Observation(PortObservation),
    Progress(ScanProgress),
    /// Always the last event of a run.
    Outcome(ScanOutcome),
}

/// Fans events out to every registered subscriber.
///
/// Delivery is ordered and never lossy; a subscriber that has dropped its
/// receiver is skipped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    subscribers: Vec<UnboundedSender<ScanEvent>>,
    release: Option<RunRelease>,
}

impl EventSink {
    pub fn new(subscribers: Vec<UnboundedSender<ScanEvent>>) -> Self {
        Self {
            subscribers,
            release: None,
        }
    }

    /// End the controller's run when the outcome goes out. The run is marked
    /// finished and the outcome delivered under one lock, so a subscriber
    /// sees the outcome before any event of a run started afterwards.
    pub(crate) fn releasing(mut self, release: RunRelease) -> Self {
        self.release = Some(release);
        self
    }

    pub fn emit(&self, event: ScanEvent) {
        match (&event, &self.release) {
            (ScanEvent::Outcome(_), Some(release)) => release.finish(|| self.broadcast(&event)),
            _ => self.broadcast(&event),
        }
    }

    fn broadcast(&self, event: &ScanEvent) {
        for subscriber in &self.subscribers {
            // Closed receivers are ignored.
            let _ = subscriber.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_progress_percent() {
        assert_eq!(ScanProgress::new(0, 10).percent, 0);
        assert_eq!(ScanProgress::new(1, 3).percent, 33);
        assert_eq!(ScanProgress::new(3, 3).percent, 100);
        assert_eq!(ScanProgress::new(0, 0).percent, 0);
        assert_eq!(ScanProgress::new(131_070, 131_070).percent, 100);
        assert_eq!(ScanProgress::finished(2, 10).percent, 100);
    }

    #[test]
    fn test_outcome_is_error() {
        assert!(!ScanOutcome::Completed.is_error());
        assert!(!ScanOutcome::Cancelled.is_error());
        assert!(ScanOutcome::InvalidRange.is_error());
        assert!(ScanOutcome::NoProtocolSelected.is_error());
        assert!(ScanOutcome::ResolutionFailed.is_error());
    }

    #[test]
    fn test_sink_fans_out_and_skips_closed() {
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        drop(rx2);

        let sink = EventSink::new(vec![tx1, tx2]);
        sink.emit(ScanEvent::Progress(ScanProgress::new(1, 2)));
        sink.emit(ScanEvent::Outcome(ScanOutcome::Completed));

        assert!(matches!(rx1.try_recv(), Ok(ScanEvent::Progress(_))));
        assert_eq!(
            rx1.try_recv().unwrap(),
            ScanEvent::Outcome(ScanOutcome::Completed)
        );
    }
}
