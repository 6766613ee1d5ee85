//! The advisory cross-process sync lock: a non-blocking exclusive
//! `flock` over a file in the config dir, per `spec.md` §5's
//! "cross-process exclusion" rule.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Holds an exclusive advisory lock for as long as it lives. Dropping
/// it releases the lock (the OS does this anyway on file close, but an
/// explicit unlock keeps the next `try_acquire` prompt rather than
/// racing the drop).
pub struct SyncLock {
    file: File,
}

impl SyncLock {
    /// Attempts to acquire the lock at `path` without blocking. Returns
    /// `None` if another process already holds it — the caller should
    /// treat this as "another instance is syncing" and run RPC only.
    pub fn try_acquire(path: &Path) -> Option<Self> {
        let file = OpenOptions::new().create(true).write(true).open(path).ok()?;
        match file.try_lock_exclusive() {
            Ok(()) => Some(Self { file }),
            Err(err) => {
                log::info!("sync lock at {} held by another process: {err}", path.display());
                None
            }
        }
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
