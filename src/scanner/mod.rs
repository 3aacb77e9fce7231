//! Scanner module - the scan engine.
//!
//! Resolves a target once, walks a port range for each selected protocol,
//! classifies every probe and streams the results as [`ScanEvent`]s. Runs are
//! driven through [`ScanController`] (or an [`ScanOrchestrator`] directly) and
//! can be cancelled between probes.

pub mod controller;
pub mod events;
pub mod orchestrator;
pub mod tcp;
pub mod traits;
pub mod udp;

pub use controller::ScanController;
pub use events::{EventSink, ScanEvent, ScanOutcome, ScanProgress};
pub use orchestrator::{ScanOrchestrator, ScanState};
pub use tcp::TcpProbe;
pub use traits::{PortObservation, PortStatus, Probe, Protocol, ScanRequest};
pub use udp::UdpProbe;

pub use tokio_util::sync::CancellationToken;
