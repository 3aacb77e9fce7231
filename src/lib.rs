//! # portmapp - A TCP/UDP Port Range Scanner
//!
//! portmapp scans a range of ports on a single host over TCP and/or UDP and
//! reports each result as soon as it is known.
//!
//! ## Features
//!
//! - **TCP connect probing**: open, closed (refused) or filtered
//! - **UDP probing**: a reply means open; silence is reported as filtered
//! - **Incremental results**: observations and progress are streamed as events
//! - **Cooperative cancellation**: a run stops before its next probe
//! - **CSV, JSON and plain text output** in the command-line front-end
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portmapp::scanner::{ScanController, ScanEvent, ScanRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let controller = ScanController::new();
//!     let mut events = controller.subscribe();
//!     controller
//!         .configure(ScanRequest::new("127.0.0.1", 1, 1024).with_udp(true))
//!         .unwrap();
//!     controller.start().unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             ScanEvent::Observation(obs) => println!("{}/{} {}", obs.port, obs.protocol, obs.status),
//!             ScanEvent::Outcome(outcome) => {
//!                 println!("{}", outcome);
//!                 break;
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Validated ports, port ranges and target resolution
//! - [`scanner`] - Probes, the scan state machine and the controller
//! - [`services`] - Well-known port labels
//! - [`config`] - Settings file handling
//! - [`output`] - Report retention and output formats
//! - [`cli`] - Command-line front-end
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError};
pub use scanner::{
    PortObservation, PortStatus, Protocol, ScanController, ScanEvent, ScanOutcome, ScanProgress,
    ScanRequest,
};
pub use types::{Port, PortRange, ScanTarget};
