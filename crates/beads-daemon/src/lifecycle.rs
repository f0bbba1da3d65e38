//! Daemon lifecycle: pid file ownership and shutdown signals.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::info;

/// Exclusive ownership of `daemon.pid` for the life of the process.
///
/// A second daemon starting in the same workspace fails to acquire the lock
/// and exits instead of fighting over the socket.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    // Held to maintain the exclusive file lock; released on drop.
    #[allow(dead_code)]
    file: File,
}

impl PidFile {
    /// Acquires the pid file, writing this process's pid into it.
    pub fn acquire(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        file.try_lock_exclusive().map_err(|_| {
            let holder = std::fs::read_to_string(&path).unwrap_or_default();
            let holder = holder.trim();
            let holder = if holder.is_empty() { "unknown" } else { holder };
            std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("daemon already running (pid {holder})"),
            )
        })?;

        let mut f = &file;
        f.set_len(0)?;
        writeln!(f, "{}", std::process::id())?;
        f.flush()?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        std::fs::remove_file(&self.path).ok();
    }
}

/// Resolves when the process receives SIGTERM, SIGINT, or SIGHUP.
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    let mut hup = signal(SignalKind::hangup()).expect("install SIGHUP handler");

    tokio::select! {
        _ = term.recv() => info!("received SIGTERM"),
        _ = int.recv() => info!("received SIGINT"),
        _ = hup.recv() => info!("received SIGHUP"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_file_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.pid");

        let pid = PidFile::acquire(&path).unwrap();
        let contents = std::fs::read_to_string(pid.path()).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());

        // A second acquire fails while the first lives.
        let err = PidFile::acquire(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);

        drop(pid);
        assert!(!path.exists());
        // Acquirable again after release.
        let _pid = PidFile::acquire(&path).unwrap();
    }
}
