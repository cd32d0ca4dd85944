//! Persisted configuration storage
//!
//! The [`FileStore`] trait is the reconciler's only way to touch the
//! filesystem. [`LocalFileStore`] writes atomically: content goes to a
//! sibling temporary file created with mode 0600, is synced, and then
//! renamed over the target, so a reader sees either the old or the new file.

use crate::error::{ConvergeError, Result};
use crate::security::{set_secure_permissions, warn_if_exposed, SecureFileMode};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Filesystem operations used for the persisted configuration
#[cfg_attr(test, mockall::automock)]
pub trait FileStore {
    /// Read a file; a missing file is `Ok(None)`
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// Replace a file's content atomically
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Copy a file, replacing the destination
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove a file; removing a missing file succeeds
    fn remove(&self, path: &Path) -> Result<()>;
}

/// [`FileStore`] on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

impl LocalFileStore {
    fn temp_path(path: &Path) -> Result<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| {
            ConvergeError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("{:?} has no file name", path),
            ))
        })?;
        let mut temp_name = std::ffi::OsString::from(".");
        temp_name.push(file_name);
        temp_name.push(format!(".{}.tmp", std::process::id()));
        Ok(path.with_file_name(temp_name))
    }

    fn write_temp(temp: &Path, contents: &str) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(temp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }
}

impl FileStore for LocalFileStore {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                warn_if_exposed(path);
                Ok(Some(contents))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConvergeError::Io(e)),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!("Creating configuration directory {:?}", parent);
                fs::create_dir_all(parent)?;
                set_secure_permissions(parent, SecureFileMode::Directory)?;
            }
        }

        let temp = Self::temp_path(path)?;
        if let Err(e) = Self::write_temp(&temp, contents).and_then(|()| fs::rename(&temp, path)) {
            if let Err(cleanup) = fs::remove_file(&temp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove temporary file {:?}: {}", temp, cleanup);
                }
            }
            return Err(ConvergeError::Io(e));
        }

        debug!("Wrote {} bytes to {:?}", contents.len(), path);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to)?;
        set_secure_permissions(to, SecureFileMode::Secret)?;
        debug!("Copied {:?} to {:?}", from, to);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConvergeError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(LocalFileStore.read(&dir.path().join("wg0.conf")).unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wg0.conf");

        LocalFileStore.write(&path, "first\n").unwrap();
        LocalFileStore.write(&path, "second\n").unwrap();
        assert_eq!(LocalFileStore.read(&path).unwrap().as_deref(), Some("second\n"));

        // No temporary files left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("wg0.conf");
        LocalFileStore.write(&path, "secret\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[test]
    fn test_copy_preserves_content() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("wg0.conf");
        let dst = dir.path().join("wg0.conf.bak");
        fs::write(&src, "original\n").unwrap();
        fs::write(&dst, "stale\n").unwrap();

        LocalFileStore.copy(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "original\n");
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let dir = tempdir().unwrap();
        let result = LocalFileStore.copy(&dir.path().join("nope"), &dir.path().join("bak"));
        assert!(result.is_err());
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wg0.conf");
        assert!(LocalFileStore.remove(&path).is_ok());

        fs::write(&path, "x").unwrap();
        LocalFileStore.remove(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_write_into_missing_parent_of_file_fails_cleanly() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        assert!(LocalFileStore.write(&blocker.join("wg0.conf"), "x").is_err());
    }
}
