//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory, or in a
//! file given explicitly. A missing file means defaults.

use crate::cli::OutputFormat;
use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portmapp)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the XDG directories. Nothing is created.
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portmapp", "portmapp")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Defaults applied when the command line leaves an option out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default port specification.
    pub ports: String,
    /// Default per-probe timeout in milliseconds.
    pub timeout_ms: u64,
    /// Scan TCP by default.
    pub tcp: bool,
    /// Scan UDP by default.
    pub udp: bool,
    /// Directory for exported CSV files.
    pub output_dir: PathBuf,
    /// Default output format.
    pub output_format: OutputFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ports: "1-1000".to_string(),
            timeout_ms: 1000,
            tcp: true,
            udp: false,
            output_dir: PathBuf::from("."),
            output_format: OutputFormat::Plain,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::new()?.settings_file();
        if !file.exists() {
            debug!(path = %file.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.ports, "1-1000");
        assert_eq!(settings.timeout_ms, 1000);
        assert!(settings.tcp);
        assert!(!settings.udp);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"udp": true, "timeout_ms": 250, "output_format": "csv"}}"#).unwrap();

        let settings = AppSettings::load_from(file.path()).unwrap();
        assert!(settings.udp);
        assert!(settings.tcp);
        assert_eq!(settings.timeout_ms, 250);
        assert_eq!(settings.output_format, OutputFormat::Csv);
        assert_eq!(settings.ports, "1-1000");
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AppSettings::load_from(file.path()),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppSettings::load_from(&dir.path().join("absent.json")),
            Err(ConfigError::ReadFailed { .. })
        ));
    }
}
