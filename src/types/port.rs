//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` is the inclusive, ascending range a scan walks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u16),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// An inclusive range of ports, always non-empty and ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Validate raw bounds into a range.
    pub fn new(start: u16, end: u16) -> Result<Self, PortError> {
        let start_port = Port::try_from(start)?;
        let end_port = Port::try_from(end)?;
        if start > end {
            return Err(PortError::InvalidRange(start, end));
        }
        Ok(Self {
            start: start_port,
            end: end_port,
        })
    }

    /// Get the number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all ports in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parse a port specification into raw `(start, end)` bounds.
///
/// Supports:
/// - Single port: "80"
/// - Range: "1-1000"
/// - Comma-separated: "22,80,443" (spans the lowest to the highest port)
///
/// Bound ordering is deliberately not checked here; the scan engine reports
/// an inverted or zero range as its own outcome.
pub fn parse_port_bounds(spec: &str) -> Result<(u16, u16), PortError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(PortError::Empty);
    }

    let parse_one = |s: &str| -> Result<u16, PortError> {
        let s = s.trim();
        s.parse::<u16>()
            .map_err(|_| PortError::InvalidFormat(s.to_string()))
    };

    if let Some((start, end)) = spec.split_once('-') {
        return Ok((parse_one(start)?, parse_one(end)?));
    }

    if spec.contains(',') {
        let ports = spec
            .split(',')
            .map(parse_one)
            .collect::<Result<Vec<u16>, _>>()?;
        let min = ports.iter().copied().min().ok_or(PortError::Empty)?;
        let max = ports.iter().copied().max().ok_or(PortError::Empty)?;
        return Ok((min, max));
    }

    let port = parse_one(spec)?;
    Ok((port, port))
}
