//! Current-state probing
//!
//! Interface existence and the persisted file are looked up independently:
//! after a reboot the file can be present while the interface is gone, and
//! an interface can be created by hand without any file.

use crate::config::Settings;
use crate::error::{ConvergeError, Result};
use crate::platform::TunnelControl;
use crate::storage::FileStore;
use tracing::debug;

/// Observed state of one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    /// Whether the live interface exists
    pub exists: bool,
    /// Content of the persisted configuration file, if any
    pub current_config_text: Option<String>,
}

/// Answers "does the interface exist" and "what does its file say"
pub struct StateProber<'a> {
    tunnel: &'a dyn TunnelControl,
    files: &'a dyn FileStore,
    settings: &'a Settings,
}

impl<'a> StateProber<'a> {
    /// Create a prober over the given collaborators
    pub fn new(
        tunnel: &'a dyn TunnelControl,
        files: &'a dyn FileStore,
        settings: &'a Settings,
    ) -> Self {
        Self {
            tunnel,
            files,
            settings,
        }
    }

    /// Probe the interface and its persisted configuration
    pub fn probe(&self, name: &str) -> Result<RuntimeState> {
        let exists = self.tunnel.exists(name).map_err(|e| {
            ConvergeError::Probe(format!("Failed to query interface {}: {}", name, e))
        })?;

        let path = self.settings.config_path(name);
        let current_config_text = self.files.read(&path).map_err(|e| {
            ConvergeError::Probe(format!("Failed to read {:?}: {}", path, e))
        })?;

        debug!(
            "Probed {}: exists={}, config_file={}",
            name,
            exists,
            current_config_text.is_some()
        );

        Ok(RuntimeState {
            exists,
            current_config_text,
        })
    }
}
