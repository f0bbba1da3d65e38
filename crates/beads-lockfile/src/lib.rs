//! Advisory file locking for the beads system.
//!
//! Concurrent syncs within one workspace are serialized through
//! `.beads/sync.lock`; syncs across workspaces are independent. A lock file
//! left behind by a crashed process is taken over once it is older than the
//! stale cutoff (default one hour).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fs2::FileExt;
use thiserror::Error;

/// Default stale-lock cutoff.
pub const DEFAULT_STALE_CUTOFF: Duration = Duration::from_secs(60 * 60);

/// Errors that can occur while acquiring a lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock file could not be created or written.
    #[error("lock I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another process holds the lock.
    #[error("lock at {path} is held by another process (pid {holder})")]
    Held {
        /// The lock file location.
        path: String,
        /// PID recorded in the lock file ("unknown" when unreadable).
        holder: String,
    },
}

/// A specialized `Result` type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// An exclusively held advisory file lock.
///
/// The OS lock is released when the guard drops; the file itself is removed
/// as well so the stale-cutoff never has to fire in the normal path.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    // Held for its exclusive flock; released on drop.
    #[allow(dead_code)]
    file: File,
}

impl LockFile {
    /// Acquires the lock at `path` with the default stale cutoff.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        Self::acquire_with_cutoff(path, DEFAULT_STALE_CUTOFF)
    }

    /// Acquires the lock at `path`.
    ///
    /// If the file exists, is not flock-held, and is older than `cutoff`, it
    /// is treated as stale, removed, and re-acquired.
    pub fn acquire_with_cutoff(path: impl AsRef<Path>, cutoff: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        loop {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&path)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    // We own it: stamp our pid for diagnostics.
                    let mut f = &file;
                    let _ = f.set_len(0);
                    let _ = writeln!(f, "{}", std::process::id());
                    let _ = f.flush();
                    return Ok(Self { path, file });
                }
                Err(_) => {
                    // Locked by someone else, or a leftover from a crash.
                    if is_stale(&path, cutoff) {
                        // A crashed holder's flock died with its process, so a
                        // stale file that still resists try_lock means an OS
                        // oddity; removing and retrying once is safe either way.
                        std::fs::remove_file(&path).ok();
                        continue;
                    }
                    let holder = std::fs::read_to_string(&path)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_else(|_| "unknown".into());
                    return Err(LockError::Held {
                        path: path.display().to_string(),
                        holder: if holder.is_empty() { "unknown".into() } else { holder },
                    });
                }
            }
        }
    }

    /// The lock file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Remove the file first; the flock releases when `file` drops.
        std::fs::remove_file(&self.path).ok();
    }
}

/// Returns `true` if the file at `path` is older than `cutoff`.
fn is_stale(path: &Path, cutoff: Duration) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(mtime) = meta.modified() else {
        return false;
    };
    SystemTime::now()
        .duration_since(mtime)
        .map(|age| age > cutoff)
        .unwrap_or(false)
}
