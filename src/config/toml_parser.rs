//! TOML settings file parser
//!
//! The settings file is split into a `[paths]` section (where configuration
//! files and backups live) and a `[tools]` section (which binaries the
//! command-backed tunnel control invokes). Every key is optional.

use crate::config::{
    default_backup_suffix, default_config_dir, default_ip_binary, default_wg_binary, Settings,
};
use crate::error::{ConvergeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// TOML settings file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlSettings {
    /// Filesystem locations
    #[serde(default)]
    pub paths: TomlPaths,

    /// External binaries
    #[serde(default)]
    pub tools: TomlTools,
}

/// `[paths]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlPaths {
    /// Directory holding interface configuration files
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    /// Suffix for backup copies
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,
}

/// `[tools]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlTools {
    /// `wg` binary
    #[serde(default = "default_wg_binary")]
    pub wg: String,

    /// `ip` binary
    #[serde(default = "default_ip_binary")]
    pub ip: String,
}

impl Default for TomlPaths {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            backup_suffix: default_backup_suffix(),
        }
    }
}

impl Default for TomlTools {
    fn default() -> Self {
        Self {
            wg: default_wg_binary(),
            ip: default_ip_binary(),
        }
    }
}

impl TomlSettings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConvergeError::Config(format!("Failed to read settings file {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
    }

    /// Parse settings from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| ConvergeError::Config(format!("Failed to parse TOML settings: {}", e)))
    }
}

impl From<TomlSettings> for Settings {
    fn from(toml: TomlSettings) -> Self {
        Settings {
            config_dir: PathBuf::from(toml.paths.config_dir),
            backup_suffix: toml.paths.backup_suffix,
            wg_binary: toml.tools.wg,
            ip_binary: toml.tools.ip,
        }
    }
}
