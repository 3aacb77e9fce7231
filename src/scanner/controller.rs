//! Caller-facing scan controller.
//!
//! Wraps the orchestrator behind `configure`/`start`/`cancel`/`is_running` and
//! a subscription interface, so any front-end can drive scans without knowing
//! about tasks or sockets. Every method takes `&self`; share the controller
//! behind an `Arc` to cancel from another task.

use crate::error::{ScanError, ScanResult};
use crate::scanner::events::{EventSink, ScanEvent, ScanOutcome};
use crate::scanner::orchestrator::ScanOrchestrator;
use crate::scanner::tcp::TcpProbe;
use crate::scanner::traits::{Probe, Protocol, ScanRequest};
use crate::scanner::udp::UdpProbe;
use crate::types::{Resolve, SystemResolver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The run in progress and the token that stops it.
#[derive(Debug)]
struct ActiveRun {
    id: u64,
    cancel: CancellationToken,
}

/// Request and run bookkeeping. Everything that decides whether a run is
/// active lives behind this one lock.
#[derive(Debug, Default)]
pub(crate) struct RunSlot {
    pending: Option<ScanRequest>,
    active: Option<ActiveRun>,
    runs: u64,
}

/// Ends one run in its controller's slot.
#[derive(Debug, Clone)]
pub(crate) struct RunRelease {
    slot: Arc<Mutex<RunSlot>>,
    id: u64,
}

impl RunRelease {
    /// Mark the run finished and call `deliver` while the slot is still
    /// locked, so no new run can start between the two.
    ///
    /// Only the first call for a run clears the slot; later calls and calls
    /// for a run that has already been replaced leave it alone.
    pub(crate) fn finish(&self, deliver: impl FnOnce()) {
        let mut slot = lock(&self.slot);
        if slot.active.as_ref().is_some_and(|run| run.id == self.id) {
            slot.active = None;
        }
        deliver();
    }
}

/// Releases the slot if the run task ends without emitting an outcome,
/// e.g. when a probe or resolver panics.
struct RunGuard(RunRelease);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.finish(|| {});
    }
}

/// Drives scan runs on a background task and publishes their events.
pub struct ScanController {
    subscribers: Mutex<Vec<UnboundedSender<ScanEvent>>>,
    slot: Arc<Mutex<RunSlot>>,
    resolver: Arc<dyn Resolve>,
    tcp: Arc<dyn Probe>,
    udp: Arc<dyn Probe>,
}

impl ScanController {
    /// Create a controller using the system resolver and the real probes.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            slot: Arc::new(Mutex::new(RunSlot::default())),
            resolver: Arc::new(SystemResolver::new()),
            tcp: Arc::new(TcpProbe::new()),
            udp: Arc::new(UdpProbe::new()),
        }
    }

    /// Replace the resolver used by future runs.
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

    /// Register a consumer. It receives every event of every run started
    /// after this call, in emission order.
    pub fn subscribe(&self) -> UnboundedReceiver<ScanEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|s| !s.is_closed());
        subscribers.push(tx);
        rx
    }

    /// Set the request for the next run.
    ///
    /// Fails with [`ScanError::InvalidState`] while a run is in progress.
    pub fn configure(&self, request: ScanRequest) -> ScanResult<()> {
        let mut slot = lock(&self.slot);
        if slot.active.is_some() {
            return Err(ScanError::InvalidState);
        }
        slot.pending = Some(request);
        Ok(())
    }

    /// Start the configured run on a background task.
    ///
    /// Consumes the pending request; the next run needs a fresh `configure`.
    /// Must be called from within a tokio runtime. The returned handle
    /// resolves to the run's outcome.
    pub fn start(&self) -> ScanResult<JoinHandle<ScanOutcome>> {
        let (request, release, token) = {
            let mut slot = lock(&self.slot);
            if slot.active.is_some() {
                return Err(ScanError::InvalidState);
            }
            let request = slot.pending.take().ok_or(ScanError::NotConfigured)?;

            slot.runs += 1;
            let id = slot.runs;
            let token = CancellationToken::new();
            slot.active = Some(ActiveRun {
                id,
                cancel: token.clone(),
            });
            let release = RunRelease {
                slot: Arc::clone(&self.slot),
                id,
            };
            (request, release, token)
        };

        let sink = EventSink::new(lock(&self.subscribers).clone()).releasing(release.clone());
        let orchestrator = ScanOrchestrator::new(request)
            .with_resolver(Arc::clone(&self.resolver))
            .with_probe(Arc::clone(&self.tcp))
            .with_probe(Arc::clone(&self.udp));

        debug!(run = release.id, "spawning scan task");
        Ok(tokio::spawn(async move {
            let guard = RunGuard(release);
            let outcome = orchestrator.run(&sink, &token).await;
            drop(guard);
            outcome
        }))
    }

    /// Request a cooperative stop of the active run.
    ///
    /// The probe in flight finishes first. Calling this repeatedly, or with no
    /// run active, does nothing.
    pub fn cancel(&self) {
        let slot = lock(&self.slot);
        if let Some(run) = &slot.active {
            if !run.cancel.is_cancelled() {
                debug!(run = run.id, "cancelling scan");
                run.cancel.cancel();
            }
        }
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        lock(&self.slot).active.is_some()
    }
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        if let Some(run) = &lock(&self.slot).active {
            warn!(run = run.id, "controller dropped during a scan, cancelling");
            run.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::PortObservation;
    use crate::types::Port;
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::time::Duration;

    #[test]
    fn test_idle_controller() {
        let controller = ScanController::new();
        assert!(!controller.is_running());
        controller.cancel();
        controller.cancel();
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_start_without_request() {
        let controller = ScanController::new();
        assert_eq!(controller.start().unwrap_err(), ScanError::NotConfigured);
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_request_is_consumed() {
        let controller = ScanController::new();
        let mut events = controller.subscribe();
        controller
            .configure(ScanRequest::new("127.0.0.1", 2, 1))
            .unwrap();

        let outcome = controller.start().unwrap().await.unwrap();
        assert_eq!(outcome, ScanOutcome::InvalidRange);
        assert_eq!(
            events.recv().await,
            Some(ScanEvent::Outcome(ScanOutcome::InvalidRange))
        );
        assert!(!controller.is_running());
        assert_eq!(controller.start().unwrap_err(), ScanError::NotConfigured);
    }

    struct PanickingProbe;

    #[async_trait]
    impl Probe for PanickingProbe {
        fn protocol(&self) -> Protocol {
            Protocol::Tcp
        }

        async fn probe(&self, _ip: IpAddr, _port: Port, _timeout: Duration) -> PortObservation {
            panic!("probe blew up");
        }
    }

    #[tokio::test]
    async fn test_panicking_run_releases_controller() {
        let controller = ScanController::new().with_probe(Arc::new(PanickingProbe));
        controller
            .configure(ScanRequest::new("127.0.0.1", 1, 3))
            .unwrap();

        let joined = controller.start().unwrap().await;
        assert!(joined.unwrap_err().is_panic());
        assert!(!controller.is_running());

        controller
            .configure(ScanRequest::new("127.0.0.1", 3, 1))
            .unwrap();
        assert_eq!(
            controller.start().unwrap().await.unwrap(),
            ScanOutcome::InvalidRange
        );
    }

    #[tokio::test]
    async fn test_cancel_right_after_start() {
        let controller = ScanController::new();
        controller
            .configure(ScanRequest::new("127.0.0.1", 1, 1000))
            .unwrap();
        let handle = controller.start().unwrap();
        assert!(controller.is_running());
        controller.cancel();
        assert_eq!(handle.await.unwrap(), ScanOutcome::Cancelled);
    }

    #[test]
    fn test_release_ignores_replaced_run() {
        let slot = Arc::new(Mutex::new(RunSlot::default()));
        lock(&slot).active = Some(ActiveRun {
            id: 2,
            cancel: CancellationToken::new(),
        });

        let stale = RunRelease {
            slot: Arc::clone(&slot),
            id: 1,
        };
        let mut delivered = false;
        stale.finish(|| delivered = true);
        assert!(delivered);
        assert!(lock(&slot).active.is_some());

        let current = RunRelease {
            slot: Arc::clone(&slot),
            id: 2,
        };
        current.finish(|| {});
        assert!(lock(&slot).active.is_none());
    }
}
