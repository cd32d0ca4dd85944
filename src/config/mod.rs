//! Configuration management
//!
//! This module handles the tool's own settings (loaded from an optional TOML
//! file) and parsing of the caller's JSON request.

mod json;
mod toml_parser;
pub mod validation;

pub use json::{ConvergeRequest, RawEndpoint, RawPeer};
pub use toml_parser::TomlSettings;

use crate::error::{ConvergeError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file consulted when none is named on the command line
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/wg-converge/config.toml";

/// Tool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding one `<name>.conf` per interface
    pub config_dir: PathBuf,

    /// Suffix appended to the config path to form the backup path
    pub backup_suffix: String,

    /// `wg` binary used by the command-backed tunnel control
    pub wg_binary: String,

    /// `ip` binary used by the command-backed tunnel control
    pub ip_binary: String,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_settings = TomlSettings::from_file(path)?;
        let settings: Settings = toml_settings.into();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from an explicit path, or from the default path if it exists
    ///
    /// An explicitly named file must exist; a missing default file just means
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_SETTINGS_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    debug!("No settings file at {}, using defaults", DEFAULT_SETTINGS_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        validation::validate_config_dir(&self.config_dir)?;
        validation::validate_backup_suffix(&self.backup_suffix)?;

        if self.wg_binary.trim().is_empty() || self.ip_binary.trim().is_empty() {
            return Err(ConvergeError::Config(
                "Tool binary paths cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the persisted configuration file for an interface
    pub fn config_path(&self, name: &str) -> PathBuf {
        self.config_dir.join(format!("{}.conf", name))
    }

    /// Sibling path receiving the previous configuration before an overwrite
    pub fn backup_path(&self, name: &str) -> PathBuf {
        self.config_dir
            .join(format!("{}.conf{}", name, self.backup_suffix))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(default_config_dir()),
            backup_suffix: default_backup_suffix(),
            wg_binary: default_wg_binary(),
            ip_binary: default_ip_binary(),
        }
    }
}

// Default values shared with the TOML layer
pub(crate) fn default_config_dir() -> String {
    "/etc/wireguard".to_string()
}

pub(crate) fn default_backup_suffix() -> String {
    ".bak".to_string()
}

pub(crate) fn default_wg_binary() -> String {
    "wg".to_string()
}

pub(crate) fn default_ip_binary() -> String {
    "ip".to_string()
}
