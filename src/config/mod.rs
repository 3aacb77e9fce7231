//! Configuration management for portmapp.
//!
//! Provides XDG-compliant settings storage. Command-line flags override
//! anything loaded here.

mod settings;

pub use settings::{AppSettings, Paths};
