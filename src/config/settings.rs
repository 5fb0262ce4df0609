//! Persisted user defaults.
//!
//! Settings live in `settings.json` under the XDG config directory
//! (`~/.config/portsweep` on Linux). A missing file means built-in defaults.

use crate::config::scan::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
use crate::error::{ConfigError, ConfigResult};
use crate::types::PortSet;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portsweep", "portsweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// User-level defaults the CLI falls back to when a flag is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default concurrency bound.
    pub default_concurrency: usize,
    /// Default per-probe timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Default port specification.
    pub default_ports: String,
    /// Default output format (plain, json, csv).
    pub default_output_format: String,
    /// Include non-open results by default.
    pub verbose: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_concurrency: DEFAULT_CONCURRENCY,
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            default_ports: "1-1024".to_string(),
            default_output_format: "plain".to_string(),
            verbose: false,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, or defaults if there is no
    /// settings file or no home directory to look in.
    pub fn load() -> ConfigResult<Self> {
        let Ok(paths) = Paths::new() else {
            return Ok(Self::default());
        };
        let file = paths.settings_file();
        if !file.exists() {
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

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn port_set(&self) -> ConfigResult<PortSet> {
        Ok(self.default_ports.parse::<PortSet>()?)
    }

    fn validate(&self) -> ConfigResult<()> {
        self.port_set()?;
        if self.default_concurrency == 0 {
            return Err(ConfigError::InvalidFormat(
                "default_concurrency must be at least 1".to_string(),
            ));
        }
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::InvalidFormat(
                "default_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
