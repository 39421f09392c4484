//! Advisory exclusive lock on the broker's data directory.
//!
//! Two brokers sharing one directory would overwrite each other's metadata
//! and queue files, so the lock is taken once at startup and held until
//! exit. The lock is tied to the open directory handle: it is released when
//! the handle is closed, including when the process dies.

use std::{
    fs::{File, TryLockError},
    path::{Path, PathBuf},
};

use ferrumq_error::DirLockError;

#[derive(Debug)]
pub struct DirLock {
    dir: PathBuf,
    handle: Option<File>,
}

impl DirLock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            handle: None,
        }
    }

    /// Opens the directory and takes a non-blocking exclusive lock on it.
    ///
    /// # Returns
    /// - [`DirLockError::InUse`] when another handle holds the lock;
    /// - [`DirLockError::Open`] when the directory cannot be opened;
    /// - [`DirLockError::Flock`] for any other locking failure.
    ///
    /// Locking an already locked `DirLock` is a no-op.
    pub fn lock(&mut self) -> Result<(), DirLockError> {
        if self.handle.is_some() {
            return Ok(());
        }

        let file = File::open(&self.dir).map_err(|e| DirLockError::Open {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        match file.try_lock() {
            Ok(()) => {
                self.handle = Some(file);
                Ok(())
            }
            Err(TryLockError::WouldBlock) => Err(DirLockError::InUse {
                path: self.dir.clone(),
            }),
            Err(TryLockError::Error(e)) => Err(DirLockError::Flock {
                path: self.dir.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Releases the lock and closes the directory handle.
    pub fn unlock(&mut self) -> Result<(), DirLockError> {
        let file = self.handle.take().ok_or_else(|| DirLockError::NotLocked {
            path: self.dir.clone(),
        })?;

        file.unlock().map_err(|e| DirLockError::Flock {
            path: self.dir.clone(),
            reason: e.to_string(),
        })
    }

    pub fn is_locked(&self) -> bool {
        self.handle.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}
