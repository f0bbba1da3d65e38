//! Discovery and management of the `.beads/` workspace directory.
//!
//! Resolution order:
//! 1. `BEADS_DB` -- explicit database file path; its parent is the workspace.
//! 2. `BEADS_DIR` -- explicit workspace directory.
//! 3. Walk up from the starting directory looking for `.beads/`.
//!
//! A `.beads/redirect` file containing one relative path points at a
//! canonical `.beads` directory elsewhere; all operations transparently use
//! the canonical location.

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The name of the beads metadata directory.
pub const BEADS_DIR_NAME: &str = ".beads";

/// The name of the redirect file inside a `.beads/` directory.
pub const REDIRECT_FILE: &str = "redirect";

/// Environment variable naming the database file directly (overrides all else).
pub const BEADS_DB_ENV: &str = "BEADS_DB";

/// Environment variable naming the workspace directory.
pub const BEADS_DIR_ENV: &str = "BEADS_DIR";

/// Well-known file names inside a resolved `.beads/` directory.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    /// The resolved (post-redirect) `.beads/` directory.
    pub beads_dir: PathBuf,
}

impl WorkspacePaths {
    /// Wraps a resolved `.beads/` directory.
    pub fn new(beads_dir: PathBuf) -> Self {
        Self { beads_dir }
    }

    /// The database file (`beads.db`), unless `BEADS_DB` overrides it.
    pub fn db_path(&self) -> PathBuf {
        if let Ok(db) = std::env::var(BEADS_DB_ENV) {
            if !db.is_empty() {
                return PathBuf::from(db);
            }
        }
        self.beads_dir.join("beads.db")
    }

    /// The canonical journal export (`beads.jsonl`).
    pub fn jsonl_path(&self) -> PathBuf {
        self.beads_dir.join("beads.jsonl")
    }

    /// Historical journal name, accepted on import when `beads.jsonl` is
    /// absent.
    pub fn legacy_jsonl_path(&self) -> PathBuf {
        self.beads_dir.join("issues.jsonl")
    }

    /// The journal file to read: `beads.jsonl`, or `issues.jsonl` when only
    /// the historical name exists.
    pub fn existing_jsonl_path(&self) -> PathBuf {
        let canonical = self.jsonl_path();
        if canonical.exists() {
            return canonical;
        }
        let legacy = self.legacy_jsonl_path();
        if legacy.exists() {
            return legacy;
        }
        canonical
    }

    /// The pre-pull snapshot (`beads.left.jsonl`).
    pub fn left_snapshot_path(&self) -> PathBuf {
        self.beads_dir.join("beads.left.jsonl")
    }

    /// The append-only deletion manifest (`deletions.jsonl`).
    pub fn deletions_path(&self) -> PathBuf {
        self.beads_dir.join("deletions.jsonl")
    }

    /// The advisory sync lock (`sync.lock`).
    pub fn sync_lock_path(&self) -> PathBuf {
        self.beads_dir.join("sync.lock")
    }

    /// The daemon pid file (`daemon.pid`).
    pub fn daemon_pid_path(&self) -> PathBuf {
        self.beads_dir.join("daemon.pid")
    }

    /// The daemon log file (`daemon.log`).
    pub fn daemon_log_path(&self) -> PathBuf {
        self.beads_dir.join("daemon.log")
    }

    /// The daemon Unix socket (`bd.sock`).
    pub fn socket_path(&self) -> PathBuf {
        self.beads_dir.join("bd.sock")
    }
}

/// Follows a redirect file if one exists in `beads_dir`.
///
/// The file holds a single relative path from the directory containing
/// `.beads` to the canonical `.beads` directory.
pub fn resolve_redirect(beads_dir: &Path) -> Result<PathBuf, ConfigError> {
    let redirect = beads_dir.join(REDIRECT_FILE);
    if !redirect.is_file() {
        return Ok(beads_dir.to_path_buf());
    }

    let raw = std::fs::read_to_string(&redirect)?;
    let target = raw.trim();
    if target.is_empty() {
        return Err(ConfigError::BadRedirect {
            path: redirect.display().to_string(),
            reason: "file is empty".into(),
        });
    }

    let base = beads_dir.parent().unwrap_or(beads_dir);
    let resolved = base.join(target);
    let canonical = resolved
        .canonicalize()
        .map_err(|e| ConfigError::BadRedirect {
            path: redirect.display().to_string(),
            reason: format!("target {} unusable: {e}", resolved.display()),
        })?;
    if !canonical.is_dir() {
        return Err(ConfigError::BadRedirect {
            path: redirect.display().to_string(),
            reason: format!("target {} is not a directory", canonical.display()),
        });
    }
    Ok(canonical)
}

/// Walk up the directory tree from `start` looking for a `.beads/` directory.
///
/// Returns the (redirect-resolved) path to the `.beads/` directory if found.
/// `BEADS_DB` and `BEADS_DIR` take priority over the walk.
pub fn find_beads_dir(start: &Path) -> Option<PathBuf> {
    // 1. BEADS_DB names the database file directly.
    if let Ok(db) = std::env::var(BEADS_DB_ENV) {
        if !db.is_empty() {
            let db_path = PathBuf::from(&db);
            if let Some(parent) = db_path.parent() {
                if parent.is_dir() {
                    return Some(parent.to_path_buf());
                }
            }
        }
    }

    // 2. BEADS_DIR names the workspace directory.
    if let Ok(env_dir) = std::env::var(BEADS_DIR_ENV) {
        if !env_dir.is_empty() {
            let env_path = PathBuf::from(&env_dir);
            if env_path.is_dir() {
                return resolve_redirect(&env_path).ok();
            }
        }
    }

    // 3. Walk up from `start` looking for .beads/.
    let start = match start.canonicalize() {
        Ok(p) => p,
        Err(_) => return None,
    };

    let mut current = start.as_path();
    loop {
        let candidate = current.join(BEADS_DIR_NAME);
        if candidate.is_dir() {
            return resolve_redirect(&candidate).ok();
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent;
            }
            _ => break, // Reached filesystem root.
        }
    }

    None
}

/// Walk up the directory tree looking for `.beads/`, returning an error if
/// not found.
pub fn find_beads_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_beads_dir(start).ok_or(ConfigError::BeadsDirNotFound)
}

/// Ensure a `.beads/` directory exists at the given path.
///
/// If `path` itself is not called `.beads`, the function creates a `.beads/`
/// subdirectory under it. The directory (and any necessary parents) is
/// created if it does not exist.
pub fn ensure_beads_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let beads_dir = if path.ends_with(BEADS_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(BEADS_DIR_NAME)
    };

    std::fs::create_dir_all(&beads_dir)?;
    Ok(beads_dir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_beads_dir_in_temp() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join(".beads");
        std::fs::create_dir(&beads).unwrap();

        let found = find_beads_dir(dir.path());
        assert!(found.is_some());
        // Canonicalize both for comparison (handles symlinks, /tmp vs /private/tmp).
        let found = found.unwrap().canonicalize().unwrap();
        let expected = beads.canonicalize().unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_find_beads_dir_in_child() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join(".beads");
        std::fs::create_dir(&beads).unwrap();

        let child = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&child).unwrap();

        let found = find_beads_dir(&child);
        assert!(found.is_some());
        let found = found.unwrap().canonicalize().unwrap();
        let expected = beads.canonicalize().unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_find_beads_dir_or_error() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join(".beads");
        std::fs::create_dir(&beads).unwrap();

        let result = find_beads_dir_or_error(dir.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_ensure_beads_dir_creates() {
        let dir = tempfile::tempdir().unwrap();
        let result = ensure_beads_dir(dir.path()).unwrap();
        assert!(result.is_dir());
        assert!(result.ends_with(".beads"));
    }

    #[test]
    fn test_ensure_beads_dir_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let result1 = ensure_beads_dir(dir.path()).unwrap();
        let result2 = ensure_beads_dir(dir.path()).unwrap();
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_redirect_resolution() {
        let root = tempfile::tempdir().unwrap();

        // Canonical workspace lives at root/canonical/.beads.
        let canonical = root.path().join("canonical").join(".beads");
        std::fs::create_dir_all(&canonical).unwrap();

        // Redirected workspace at root/worktree/.beads points to it.
        let redirected = root.path().join("worktree").join(".beads");
        std::fs::create_dir_all(&redirected).unwrap();
        std::fs::write(redirected.join(REDIRECT_FILE), "../canonical/.beads\n").unwrap();

        let resolved = resolve_redirect(&redirected).unwrap();
        assert_eq!(resolved, canonical.canonicalize().unwrap());

        let found = find_beads_dir(&root.path().join("worktree")).unwrap();
        assert_eq!(found, canonical.canonicalize().unwrap());
    }

    #[test]
    fn test_redirect_empty_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join(".beads");
        std::fs::create_dir(&beads).unwrap();
        std::fs::write(beads.join(REDIRECT_FILE), "   \n").unwrap();

        assert!(matches!(
            resolve_redirect(&beads),
            Err(ConfigError::BadRedirect { .. })
        ));
    }

    #[test]
    fn test_redirect_dangling_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join(".beads");
        std::fs::create_dir(&beads).unwrap();
        std::fs::write(beads.join(REDIRECT_FILE), "../nowhere/.beads\n").unwrap();

        assert!(matches!(
            resolve_redirect(&beads),
            Err(ConfigError::BadRedirect { .. })
        ));
    }

    #[test]
    fn test_workspace_paths() {
        let dir = tempfile::tempdir().unwrap();
        let paths = WorkspacePaths::new(dir.path().to_path_buf());
        assert!(paths.jsonl_path().ends_with("beads.jsonl"));
        assert!(paths.left_snapshot_path().ends_with("beads.left.jsonl"));
        assert!(paths.deletions_path().ends_with("deletions.jsonl"));
        assert!(paths.sync_lock_path().ends_with("sync.lock"));
        assert!(paths.socket_path().ends_with("bd.sock"));
    }

    #[test]
    fn test_existing_jsonl_prefers_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let paths = WorkspacePaths::new(dir.path().to_path_buf());

        // Nothing exists yet: canonical name returned for creation.
        assert_eq!(paths.existing_jsonl_path(), paths.jsonl_path());

        // Only the legacy name exists.
        std::fs::write(paths.legacy_jsonl_path(), "").unwrap();
        assert_eq!(paths.existing_jsonl_path(), paths.legacy_jsonl_path());

        // Canonical wins once present.
        std::fs::write(paths.jsonl_path(), "").unwrap();
        assert_eq!(paths.existing_jsonl_path(), paths.jsonl_path());
    }
}
