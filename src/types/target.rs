//! Scan target resolution.
//!
//! A target is given as a hostname or a literal address and resolved exactly
//! once per scan run. Every probe of the run addresses the same [`ScanTarget`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// A scan target that has been resolved to an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    /// The original input (hostname or IP string).
    pub original: String,
    /// The resolved IP address.
    pub ip: IpAddr,
}

impl ScanTarget {
    /// Create a new scan target.
    pub fn new(original: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original == self.ip.to_string() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.original, self.ip)
        }
    }
}

/// Error type for target resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("empty target")]
    Empty,
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IP addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}

/// Resolves a target string to a single address.
///
/// One call is authoritative for a whole scan run; implementations must not
/// retry.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, target: &str) -> Result<ScanTarget, TargetError>;
}

/// Resolver backed by the host's DNS configuration.
///
/// Literal addresses are returned as-is without touching the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }

    fn build_resolver() -> TokioAsyncResolver {
        TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            debug!(error = %e, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        })
    }
}

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, target: &str) -> Result<ScanTarget, TargetError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(TargetError::Empty);
        }

        // Try parsing as IP address first
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(ScanTarget::new(target, ip));
        }

        let resolver = Self::build_resolver();
        let response = resolver
            .lookup_ip(target)
            .await
            .map_err(|e| TargetError::DnsResolutionFailed(target.to_string(), e.to_string()))?;

        let ip = response
            .iter()
            .next()
            .ok_or_else(|| TargetError::NoAddressesFound(target.to_string()))?;

        debug!(host = target, %ip, "resolved target");
        Ok(ScanTarget::new(target, ip))
    }
}
