//! Directory-creation mutex.
//!
//! `create_dir` is atomic on every platform we care about, so whichever
//! process creates the directory owns the lock. A crash while holding it
//! leaves the directory behind; it must then be removed by hand.

use crate::error::{DeckError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

const OWNER_FILE: &str = "owner";

/// Held lock. Dropping it removes the lock directory.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    token: String,
}

impl DirLock {
    /// Try once. `Ok(None)` means someone else holds the lock.
    pub fn try_acquire(path: &Path) -> Result<Option<DirLock>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::create_dir(path) {
            Ok(()) => {
                let token = uuid::Uuid::new_v4().to_string();
                let owner = format!("pid={}\ntoken={token}\n", std::process::id());
                // The directory itself is the lock; the owner file is only
                // for whoever has to clean up a stale one.
                if let Err(e) = std::fs::write(path.join(OWNER_FILE), owner) {
                    tracing::debug!(error = %e, "could not write lock owner file");
                }
                tracing::debug!(lock = %path.display(), "acquired lock");
                Ok(Some(DirLock {
                    path: path.to_path_buf(),
                    token,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Poll up to `retries` additional times, sleeping `backoff` between
    /// attempts. Fails with `LockTimeout` when the budget runs out.
    pub fn acquire(path: &Path, retries: u32, backoff: Duration) -> Result<DirLock> {
        for attempt in 0..=retries {
            if let Some(lock) = Self::try_acquire(path)? {
                return Ok(lock);
            }
            if attempt < retries {
                tracing::debug!(lock = %path.display(), attempt, "lock held, waiting");
                std::thread::sleep(backoff);
            }
        }
        Err(DeckError::LockTimeout(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn owned_by_us(&self) -> bool {
        match std::fs::read_to_string(self.path.join(OWNER_FILE)) {
            Ok(owner) => owner.lines().any(|l| l == format!("token={}", self.token)),
            // No owner file: we failed to write it, the directory is still ours.
            Err(e) => e.kind() == std::io::ErrorKind::NotFound && self.path.exists(),
        }
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if !self.owned_by_us() {
            tracing::warn!(lock = %self.path.display(), "lock was taken over; leaving it in place");
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release lock");
        } else {
            tracing::debug!(lock = %self.path.display(), "released lock");
        }
    }
}
