//! Service labels for well-known port numbers.
//!
//! Provides a static mapping from port numbers to human-readable service labels.
//! The table is a sorted static slice searched with a binary search.

/// Label returned for ports that are not in the table.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Well-known ports and their labels, sorted by port number.
static PORT_SERVICES: &[(u16, &str)] = &[
    (20, "FTP Data"),
    (21, "FTP Control"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (465, "SMTPS"),
    (587, "SMTP Submission"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (3389, "RDP"),
];

/// Look up the service label for a given port.
///
/// Returns `None` if the port is not in the well-known services table.
pub fn get_service_name(port: u16) -> Option<&'static str> {
    PORT_SERVICES
        .binary_search_by_key(&port, |&(p, _)| p)
        .ok()
        .map(|idx| PORT_SERVICES[idx].1)
}

/// Get the service label for a port, falling back to [`UNKNOWN_SERVICE`].
pub fn get_service_description(port: u16) -> &'static str {
    get_service_name(port).unwrap_or(UNKNOWN_SERVICE)
}
