//! The scan state machine.
//!
//! One orchestrator drives one run:
//!
//! ```text
//! Idle -> Resolving -> ScanningTcp -> ScanningUdp -> Finalizing -> Done
//! ```
//!
//! Either scanning state is skipped when its protocol is not selected, and
//! validation or resolution failures jump straight to `Finalizing`. Probes run
//! strictly one after another; the cancellation token is checked before each
//! probe, so an in-flight probe always finishes (bounded by its timeout)
//! before a cancellation takes effect.

use crate::scanner::events::{EventSink, ScanEvent, ScanOutcome, ScanProgress};
use crate::scanner::tcp::TcpProbe;
use crate::scanner::traits::{Probe, Protocol, ScanRequest};
use crate::scanner::udp::UdpProbe;
use crate::types::{PortRange, Resolve, ScanTarget, SystemResolver};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// States of a scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Resolving,
    Scanning(Protocol),
    Finalizing(ScanOutcome),
    Done,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Scanning(protocol) => write!(f, "scanning {}", protocol),
            Self::Finalizing(outcome) => write!(f, "finalizing ({})", outcome),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Counts probes and remembers the last percentage reported.
#[derive(Debug, Default)]
struct ProgressTracker {
    scanned: usize,
    total: usize,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    fn record(&mut self) -> ScanProgress {
        self.scanned += 1;
        let progress = ScanProgress::new(self.scanned, self.total);
        self.last_percent = Some(progress.percent);
        progress
    }
}

/// Runs one scan request end to end.
///
/// `run` consumes the orchestrator: once a run is done the instance is gone,
/// and a new run needs a new orchestrator.
pub struct ScanOrchestrator {
    request: ScanRequest,
    resolver: Arc<dyn Resolve>,
    tcp: Arc<dyn Probe>,
    udp: Arc<dyn Probe>,
    state: ScanState,
    progress: ProgressTracker,
}

impl ScanOrchestrator {
    /// Create an orchestrator using the system resolver and the real probes.
    pub fn new(request: ScanRequest) -> Self {
        Self {
            request,
            resolver: Arc::new(SystemResolver::new()),
            tcp: Arc::new(TcpProbe::new()),
            udp: Arc::new(UdpProbe::new()),
            state: ScanState::Idle,
            progress: ProgressTracker::default(),
        }
    }

    /// Replace the resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the probe for the protocol `probe` speaks.
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        match probe.protocol() {
            Protocol::Tcp => self.tcp = probe,
            Protocol::Udp => self.udp = probe,
        }
        self
    }

    fn transition(&mut self, next: ScanState) {
        debug!(from = %self.state, to = %next, "scan state transition");
        self.state = next;
    }

    fn probe_for(&self, protocol: Protocol) -> Arc<dyn Probe> {
        match protocol {
            Protocol::Tcp => Arc::clone(&self.tcp),
            Protocol::Udp => Arc::clone(&self.udp),
        }
    }

    /// Check the request before any network activity.
    fn validate(&self) -> Result<PortRange, ScanOutcome> {
        let range = PortRange::new(self.request.start_port, self.request.end_port)
            .map_err(|e| {
                warn!(error = %e, "rejecting scan request");
                ScanOutcome::InvalidRange
            })?;

        if !self.request.scan_tcp && !self.request.scan_udp {
            warn!("rejecting scan request: no protocol selected");
            return Err(ScanOutcome::NoProtocolSelected);
        }

        Ok(range)
    }

    /// Execute the run, emitting every event through `sink`.
    ///
    /// Returns the outcome, which has also been emitted as the final event.
    pub async fn run(mut self, sink: &EventSink, cancel: &CancellationToken) -> ScanOutcome {
        let started = Instant::now();
        info!(
            host = %self.request.target,
            start = self.request.start_port,
            end = self.request.end_port,
            tcp = self.request.scan_tcp,
            udp = self.request.scan_udp,
            "starting scan"
        );

        let outcome = match self.validate() {
            Ok(range) => self.scan(range, sink, cancel).await,
            Err(outcome) => outcome,
        };

        self.finalize(outcome, sink);
        info!(
            %outcome,
            probes = self.progress.scanned,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan finished"
        );
        outcome
    }

    async fn scan(
        &mut self,
        range: PortRange,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        self.transition(ScanState::Resolving);
        let target = match self.resolve().await {
            Some(target) => target,
            None => return ScanOutcome::ResolutionFailed,
        };
        sink.emit(ScanEvent::Resolved(target.clone()));

        let protocols = self.request.protocols();
        self.progress.total = range.len() * protocols.len();
        let timeout = self.request.timeout();

        for protocol in protocols {
            if cancel.is_cancelled() {
                return ScanOutcome::Cancelled;
            }
            self.transition(ScanState::Scanning(protocol));
            info!(%protocol, ports = %range, "phase started");
            sink.emit(ScanEvent::PhaseStarted(protocol));

            let probe = self.probe_for(protocol);
            for port in range.iter() {
                if cancel.is_cancelled() {
                    info!(%protocol, next_port = %port, "cancellation requested");
                    return ScanOutcome::Cancelled;
                }

                let observation = probe.probe(target.ip, port, timeout).await;
                sink.emit(ScanEvent::Observation(observation));
                sink.emit(ScanEvent::Progress(self.progress.record()));
            }
        }

        ScanOutcome::Completed
    }

    async fn resolve(&self) -> Option<ScanTarget> {
        match self.resolver.resolve(&self.request.target).await {
            Ok(target) => {
                info!(resolved = %target, "target resolved");
                Some(target)
            }
            Err(e) => {
                warn!(error = %e, "target resolution failed");
                None
            }
        }
    }

    fn finalize(&mut self, outcome: ScanOutcome, sink: &EventSink) {
        self.transition(ScanState::Finalizing(outcome));

        if !outcome.is_error() && self.progress.last_percent != Some(100) {
            let progress = ScanProgress::finished(self.progress.scanned, self.progress.total);
            self.progress.last_percent = Some(progress.percent);
            sink.emit(ScanEvent::Progress(progress));
        }
        sink.emit(ScanEvent::Outcome(outcome));

        self.transition(ScanState::Done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::{PortObservation, PortStatus};
    use crate::types::{Port, TargetError};
    use async_trait::async_trait;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct FixedResolver;

    #[async_trait]
    impl Resolve for FixedResolver {
        async fn resolve(&self, target: &str) -> Result<ScanTarget, TargetError> {
            Ok(ScanTarget::new(target, IpAddr::V4(Ipv4Addr::LOCALHOST)))
        }
    }

    struct StubProbe(Protocol);

    #[async_trait]
    impl Probe for StubProbe {
        fn protocol(&self) -> Protocol {
            self.0
        }

        async fn probe(&self, _ip: IpAddr, port: Port, _timeout: Duration) -> PortObservation {
            PortObservation::new(port, self.0, PortStatus::Filtered)
        }
    }

    fn stubbed(request: ScanRequest) -> ScanOrchestrator {
        ScanOrchestrator::new(request)
            .with_resolver(Arc::new(FixedResolver))
            .with_probe(Arc::new(StubProbe(Protocol::Tcp)))
            .with_probe(Arc::new(StubProbe(Protocol::Udp)))
    }

    async fn collect(orchestrator: ScanOrchestrator) -> (ScanOutcome, Vec<ScanEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(vec![tx]);
        let outcome = orchestrator.run(&sink, &CancellationToken::new()).await;
        drop(sink);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    #[tokio::test]
    async fn test_inverted_range() {
        let (outcome, events) = collect(stubbed(ScanRequest::new("host", 5, 1))).await;
        assert_eq!(outcome, ScanOutcome::InvalidRange);
        assert_eq!(events, vec![ScanEvent::Outcome(ScanOutcome::InvalidRange)]);
    }

    #[tokio::test]
    async fn test_port_zero_is_invalid() {
        let (outcome, _) = collect(stubbed(ScanRequest::new("host", 0, 10))).await;
        assert_eq!(outcome, ScanOutcome::InvalidRange);
    }

    #[tokio::test]
    async fn test_range_checked_before_protocols() {
        let request = ScanRequest::new("host", 9, 3).with_tcp(false);
        let (outcome, _) = collect(stubbed(request)).await;
        assert_eq!(outcome, ScanOutcome::InvalidRange);
    }

    #[tokio::test]
    async fn test_no_protocol() {
        let request = ScanRequest::new("host", 1, 3).with_tcp(false).with_udp(false);
        let (outcome, events) = collect(stubbed(request)).await;
        assert_eq!(outcome, ScanOutcome::NoProtocolSelected);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_event_sequence() {
        let request = ScanRequest::new("host", 10, 11).with_udp(true);
        let (outcome, events) = collect(stubbed(request)).await;
        assert_eq!(outcome, ScanOutcome::Completed);

        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                ScanEvent::Resolved(_) => "resolved",
                ScanEvent::PhaseStarted(_) => "phase",
                ScanEvent::Observation(_) => "obs",
                ScanEvent::Progress(_) => "progress",
                ScanEvent::Outcome(_) => "outcome",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "resolved", "phase", "obs", "progress", "obs", "progress", "phase", "obs",
                "progress", "obs", "progress", "outcome"
            ]
        );

        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Progress(p) => Some(p.percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_probe() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(vec![tx]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = stubbed(ScanRequest::new("host", 1, 100)).run(&sink, &cancel).await;
        drop(sink);
        assert_eq!(outcome, ScanOutcome::Cancelled);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Observation(_))));
        assert_eq!(
            &events[events.len() - 2..],
            &[
                ScanEvent::Progress(ScanProgress::finished(0, 100)),
                ScanEvent::Outcome(ScanOutcome::Cancelled)
            ]
        );
    }
}
