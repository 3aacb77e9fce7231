//! Consumer-side record of one scan run.
//!
//! The engine keeps nothing once an event is emitted; a front-end that wants
//! the full result list folds the event stream into a [`ScanReport`].

use crate::scanner::{PortObservation, PortStatus, Protocol, ScanEvent, ScanOutcome, ScanRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated results of a scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Target as given (hostname or IP).
    pub target: String,
    /// Resolved IP address, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Protocols requested, in phase order.
    pub protocols: Vec<Protocol>,
    pub start_port: u16,
    pub end_port: u16,
    /// When the report was opened.
    pub started_at: DateTime<Utc>,
    /// When the outcome arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Terminal outcome, once received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ScanOutcome>,
    /// Number of open ports found (TCP open or UDP reply).
    pub open_ports: usize,
    /// Number of closed ports found.
    pub closed_ports: usize,
    /// Number of filtered ports found.
    pub filtered_ports: usize,
    /// Individual observations, in arrival order.
    pub results: Vec<PortObservation>,
}

impl ScanReport {
    /// Open an empty report for `request`.
    pub fn new(request: &ScanRequest) -> Self {
        Self {
            target: request.target.clone(),
            ip_address: None,
            protocols: request.protocols(),
            start_port: request.start_port,
            end_port: request.end_port,
            started_at: Utc::now(),
            completed_at: None,
            outcome: None,
            open_ports: 0,
            closed_ports: 0,
            filtered_ports: 0,
            results: Vec::new(),
        }
    }

    /// Fold one event into the report.
    pub fn apply(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Resolved(target) => self.ip_address = Some(target.ip.to_string()),
            ScanEvent::Observation(observation) => self.record(observation.clone()),
            ScanEvent::Outcome(outcome) => {
                self.outcome = Some(*outcome);
                self.completed_at = Some(Utc::now());
            }
            ScanEvent::PhaseStarted(_) | ScanEvent::Progress(_) => {}
        }
    }

    fn record(&mut self, observation: PortObservation) {
        match observation.status {
            PortStatus::Open | PortStatus::OpenUdp => self.open_ports += 1,
            PortStatus::Closed => self.closed_ports += 1,
            PortStatus::Filtered => self.filtered_ports += 1,
        }
        self.results.push(observation);
    }

    /// Observations that found the port open.
    pub fn open_results(&self) -> impl Iterator<Item = &PortObservation> {
        self.results.iter().filter(|r| r.is_open())
    }

    /// Wall time from opening the report to the outcome, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }

    /// Get a short summary of the scan.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) - {} open, {} closed, {} filtered [{:.2}s]",
            self.target,
            self.ip_address.as_deref().unwrap_or("unresolved"),
            self.open_ports,
            self.closed_ports,
            self.filtered_ports,
            self.duration_ms() as f64 / 1000.0
        )
    }
}
