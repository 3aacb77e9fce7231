//! UDP probe implementation.
//!
//! Sends a marker datagram and waits for anything to come back. UDP has no
//! handshake, so the result is a heuristic:
//!
//! 1. **Any datagram received** within the timeout: open
//! 2. **Silence, or any local socket failure**: filtered
//!
//! ICMP port-unreachable messages are not inspected, so a closed port and a
//! dropped probe look the same. The socket is left unconnected and replies are
//! not matched against the target's address; any datagram on the local
//! endpoint counts.

use crate::scanner::traits::{PortObservation, PortStatus, Probe, Protocol};
use crate::types::Port;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Payload sent to every UDP port.
pub const DEFAULT_PAYLOAD: &[u8] = b"UDP_SCAN";

/// UDP probe for detecting responsive UDP ports.
#[derive(Debug, Clone)]
pub struct UdpProbe {
    payload: &'static [u8],
}

impl UdpProbe {
    /// Create a probe that sends [`DEFAULT_PAYLOAD`].
    pub fn new() -> Self {
        Self {
            payload: DEFAULT_PAYLOAD,
        }
    }

    /// Send a different payload, e.g. an empty datagram.
    pub fn with_payload(payload: &'static [u8]) -> Self {
        Self { payload }
    }

    /// Send the payload and wait for a reply.
    async fn exchange(&self, addr: SocketAddr, limit: Duration) -> io::Result<PortStatus> {
        // Bind to random local port
        let local_addr = match addr {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(local_addr).await?;

        timeout(limit, socket.send_to(self.payload, addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "send timed out"))??;

        let mut buf = [0u8; 1024];
        match timeout(limit, socket.recv_from(&mut buf)).await {
            Ok(Ok((n, from))) => {
                trace!(%addr, %from, bytes = n, "udp reply");
                Ok(PortStatus::OpenUdp)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(PortStatus::Filtered),
        }
    }
}

impl Default for UdpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for UdpProbe {
    fn protocol(&self) -> Protocol {
        Protocol::Udp
    }

    async fn probe(&self, ip: IpAddr, port: Port, limit: Duration) -> PortObservation {
        let addr = SocketAddr::new(ip, port.as_u16());
        let start = Instant::now();

        let status = self.exchange(addr, limit).await.unwrap_or_else(|e| {
            trace!(%addr, error = %e, "udp probe failed");
            PortStatus::Filtered
        });

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(%addr, %status, elapsed_ms = elapsed, "udp probe");
        PortObservation::new(port, Protocol::Udp, status).with_response_time(elapsed)
    }
}
