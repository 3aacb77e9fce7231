//! TCP connect probe.
//!
//! Performs a standard TCP connect using the operating system's socket API.
//! Only an active refusal counts as closed; every other failure, including a
//! timeout or an unreachable route, is reported as filtered.

use crate::scanner::traits::{PortObservation, PortStatus, Probe, Protocol};
use crate::types::Port;
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::{debug, trace};

/// TCP connect probe.
///
/// Does not require elevated privileges. Each call creates its own socket and
/// releases it before returning, on every path.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl TcpProbe {
    pub fn new() -> Self {
        Self
    }

    /// Open a fresh socket and connect within `limit`.
    async fn attempt_connect(addr: SocketAddr, limit: Duration) -> io::Result<TcpStream> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };

        within(limit, socket.connect(addr)).await
    }
}

/// Await `attempt` for at most `limit`; running out of time is a `TimedOut` error.
async fn within<T>(
    limit: Duration,
    attempt: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
    }
}

/// Map a failed connect to a port status.
pub(crate) fn classify_connect_error(err: &io::Error) -> PortStatus {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => PortStatus::Closed,
        _ => PortStatus::Filtered,
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn protocol(&self) -> Protocol {
        Protocol::Tcp
    }

    async fn probe(&self, ip: IpAddr, port: Port, limit: Duration) -> PortObservation {
        let addr = SocketAddr::new(ip, port.as_u16());
        let start = Instant::now();

        let status = match Self::attempt_connect(addr, limit).await {
            Ok(mut stream) => {
                if let Ok(Err(e)) = timeout(limit, stream.shutdown()).await {
                    trace!(%addr, error = %e, "shutdown after connect failed");
                }
                drop(stream);
                PortStatus::Open
            }
            Err(e) => {
                trace!(%addr, error = %e, "connect failed");
                classify_connect_error(&e)
            }
        };

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(%addr, %status, elapsed_ms = elapsed, "tcp probe");
        PortObservation::new(port, Protocol::Tcp, status).with_response_time(elapsed)
    }
}
