//! File permission enforcement
//!
//! Configuration files and their backups carry the interface private key,
//! so they are kept owner-only.

use crate::error::ConvergeError;
use std::path::Path;
use tracing::{debug, warn};

/// Secure file mode requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureFileMode {
    /// File containing key material (0600)
    Secret,
    /// Directory holding secret files (0700)
    Directory,
}

impl SecureFileMode {
    /// Get the permission mode to apply
    #[cfg(unix)]
    pub fn mode(&self) -> u32 {
        match self {
            Self::Secret => 0o600,
            Self::Directory => 0o700,
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Secret => "0600 (owner read/write only)",
            Self::Directory => "0700 (owner only)",
        }
    }
}

/// Set secure file permissions
#[cfg(unix)]
pub fn set_secure_permissions(path: &Path, mode: SecureFileMode) -> Result<(), ConvergeError> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(mode.mode());
    std::fs::set_permissions(path, perms).map_err(|e| {
        ConvergeError::Permission(format!("Failed to set permissions on {:?}: {}", path, e))
    })?;

    debug!("Set permissions on {:?} to {}", path, mode.description());
    Ok(())
}

/// Set secure file permissions (non-Unix stub)
#[cfg(not(unix))]
pub fn set_secure_permissions(path: &Path, _mode: SecureFileMode) -> Result<(), ConvergeError> {
    debug!("Permission setting not implemented for this platform: {:?}", path);
    Ok(())
}

/// Warn when an existing secret file is readable by group or others
#[cfg(unix)]
pub fn warn_if_exposed(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                "File {:?} has insecure permissions: {:o} (expected {})",
                path,
                mode,
                SecureFileMode::Secret.description()
            );
        }
    }
}

/// Warn when an existing secret file is exposed (non-Unix stub)
#[cfg(not(unix))]
pub fn warn_if_exposed(_path: &Path) {}
