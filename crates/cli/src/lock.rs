//! Install lock
//!
//! Two provisioning runs against the same install directory would race on
//! the env file and the container set, so a run holds an exclusive lock
//! file for its whole duration. The lock sits next to the install directory
//! so a fresh directory stays empty for the source checkout.

use anyhow::{bail, Context, Result};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `/opt/app` is locked by `/opt/.app.provision.lock`
pub fn lock_path(install_dir: &Path) -> PathBuf {
    match install_dir.file_name() {
        Some(name) => install_dir.with_file_name(format!(".{}.provision.lock", name.to_string_lossy())),
        None => install_dir.join(".provision.lock"),
    }
}

/// Exclusive lock on an install directory, released on drop
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(install_dir: &Path) -> Result<Self> {
        let path = lock_path(install_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path).unwrap_or_default();
                bail!(
                    "Another provisioning run holds {} ({}); remove it if that run is gone",
                    path.display(),
                    holder.trim()
                );
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create lock {}", path.display()))
            }
        };

        writeln!(file, "pid {} since {}", std::process::id(), chrono::Utc::now().to_rfc3339())
            .with_context(|| format!("Failed to write lock {}", path.display()))?;

        debug!(path = %path.display(), "Acquired install lock");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release install lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path() {
        assert_eq!(
            lock_path(Path::new("/opt/app")),
            PathBuf::from("/opt/.app.provision.lock")
        );
        assert_eq!(lock_path(Path::new("/")), PathBuf::from("/.provision.lock"));
    }

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let temp_dir = TempDir::new().unwrap();
        let install_dir = temp_dir.path().join("app");

        let lock = InstallLock::acquire(&install_dir).unwrap();
        assert!(lock.path().exists());
        assert!(!install_dir.exists());
        assert!(InstallLock::acquire(&install_dir).is_err());

        let path = lock.path().to_path_buf();
        drop(lock);
        assert!(!path.exists());
        assert!(InstallLock::acquire(&install_dir).is_ok());
    }
}
