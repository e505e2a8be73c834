//! Advisory run lock
//!
//! Two overlapping runs would read the same pending posts and publish them
//! twice. Taking an exclusive file lock before fetching keeps runs on one
//! host serialized. The lock is released when the guard is dropped, and by
//! the OS if the process dies.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{LockError, Result};

/// Held for the duration of a run.
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock without waiting.
    ///
    /// Returns `Ok(None)` when another process holds it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LockError::Create {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Create {
                path: path.to_path_buf(),
                source,
            })?;

        // Fully qualified: newer std has its own File::try_lock_exclusive
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                info!("Acquired run lock {}", path.display());
                let mut lock = Self {
                    file,
                    path: path.to_path_buf(),
                };
                lock.write_owner();
                Ok(Some(lock))
            }
            Err(e) if is_contended(&e) => {
                debug!("Run lock {} is held by another process", path.display());
                Ok(None)
            }
            Err(source) => Err(LockError::Acquire {
                path: path.to_path_buf(),
                source,
            }
            .into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the holder's pid in the lock file; purely informational.
    fn write_owner(&mut self) {
        let result = self
            .file
            .set_len(0)
            .and_then(|_| writeln!(self.file, "{}", std::process::id()));
        if let Err(e) = result {
            debug!("Could not write pid to {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to release run lock {}: {}", self.path.display(), e);
        } else {
            debug!("Released run lock {}", self.path.display());
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
