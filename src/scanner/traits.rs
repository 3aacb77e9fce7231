//! Probe trait abstraction and the data it produces.
//!
//! Defines a common interface for the TCP and UDP probes,
//! enabling polymorphism and easier testing.

use crate::services::get_service_description;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Transport protocol of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.pad("TCP"),
            Self::Udp => f.pad("UDP"),
        }
    }
}

/// Status of a probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    /// A TCP connection was established.
    Open,
    /// A UDP datagram came back within the timeout.
    OpenUdp,
    /// The remote stack actively refused the connection.
    Closed,
    /// No conclusive signal: timeout, unreachable, local failure, or silence.
    Filtered,
}

impl PortStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::OpenUdp)
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.pad("open"),
            Self::OpenUdp => f.pad("open (udp)"),
            Self::Closed => f.pad("closed"),
            Self::Filtered => f.pad("filtered"),
        }
    }
}

/// The classified result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortObservation {
    /// The port that was probed.
    pub port: Port,
    pub protocol: Protocol,
    pub status: PortStatus,
    /// Service label from the well-known port table, or "Unknown".
    pub service: String,
    /// Wall time the probe took, in milliseconds.
    pub response_time_ms: u64,
}

impl PortObservation {
    /// Create an observation, filling in the service label for `port`.
    pub fn new(port: Port, protocol: Protocol, status: PortStatus) -> Self {
        Self {
            port,
            protocol,
            status,
            service: get_service_description(port.as_u16()).to_string(),
            response_time_ms: 0,
        }
    }

    /// Set the response time.
    pub fn with_response_time(mut self, time_ms: u64) -> Self {
        self.response_time_ms = time_ms;
        self
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Parameters of one scan run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Hostname or literal address.
    pub target: String,
    pub start_port: u16,
    pub end_port: u16,
    pub scan_tcp: bool,
    pub scan_udp: bool,
    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ScanRequest {
    /// Default per-probe timeout.
    pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

    /// Create a TCP-only request with the default timeout.
    pub fn new(target: impl Into<String>, start_port: u16, end_port: u16) -> Self {
        Self {
            target: target.into(),
            start_port,
            end_port,
            scan_tcp: true,
            scan_udp: false,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_tcp(mut self, enabled: bool) -> Self {
        self.scan_tcp = enabled;
        self
    }

    pub fn with_udp(mut self, enabled: bool) -> Self {
        self.scan_udp = enabled;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Per-probe timeout; never zero.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    /// Protocols selected, in the order their phases run.
    pub fn protocols(&self) -> Vec<Protocol> {
        let mut protocols = Vec::with_capacity(2);
        if self.scan_tcp {
            protocols.push(Protocol::Tcp);
        }
        if self.scan_udp {
            protocols.push(Protocol::Udp);
        }
        protocols
    }
}

/// Trait for single-port probe implementations.
///
/// A probe makes exactly one network attempt and always produces an
/// observation: failures are classified, never returned as errors. No socket
/// outlives the call.
///
/// # Example
///
/// ```ignore
/// use portmapp::scanner::{Probe, TcpProbe};
///
/// let obs = TcpProbe::new().probe(ip, port, Duration::from_millis(500)).await;
/// println!("{}/{} is {}", obs.port, obs.protocol, obs.status);
/// ```
#[async_trait]
pub trait Probe: Send + Sync {
    /// Protocol this probe speaks.
    fn protocol(&self) -> Protocol;

    /// Probe a single port, waiting at most `timeout` per network wait.
    async fn probe(&self, ip: IpAddr, port: Port, timeout: Duration) -> PortObservation;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_status_display() {
        assert_eq!(PortStatus::Open.to_string(), "open");
        assert_eq!(PortStatus::OpenUdp.to_string(), "open (udp)");
        assert_eq!(PortStatus::Closed.to_string(), "closed");
        assert_eq!(PortStatus::Filtered.to_string(), "filtered");
    }

    #[test]
    fn test_observation_service_label() {
        let port = Port::new(22).unwrap();
        let obs = PortObservation::new(port, Protocol::Tcp, PortStatus::Open).with_response_time(3);
        assert_eq!(obs.service, "SSH");
        assert_eq!(obs.response_time_ms, 3);
        assert!(obs.is_open());

        let obs = PortObservation::new(Port::new(40000).unwrap(), Protocol::Udp, PortStatus::Filtered);
        assert_eq!(obs.service, "Unknown");
        assert!(!obs.is_open());
    }

    #[test]
    fn test_request_protocols() {
        let req = ScanRequest::new("localhost", 1, 10);
        assert_eq!(req.protocols(), vec![Protocol::Tcp]);

        let req = req.with_udp(true);
        assert_eq!(req.protocols(), vec![Protocol::Tcp, Protocol::Udp]);

        let req = req.with_tcp(false).with_udp(false);
        assert!(req.protocols().is_empty());
    }

    #[test]
    fn test_request_timeout_never_zero() {
        let req = ScanRequest::new("localhost", 1, 1).with_timeout_ms(0);
        assert_eq!(req.timeout(), Duration::from_millis(1));
    }
}
