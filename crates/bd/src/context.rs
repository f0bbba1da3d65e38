//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds all the state a command handler needs:
//! resolved workspace paths, actor name, and global flags. Commands open
//! the store lazily through [`RuntimeContext::workspace`].

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context as _, Result};

use beads_config::{beads_dir, config as cfg, BeadsConfig, WorkspacePaths};
use beads_storage::SqliteStore;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
pub struct RuntimeContext {
    /// Explicit `.beads` directory (from `--db`), overriding discovery.
    pub db_path: Option<PathBuf>,

    /// Actor name for authorship and decision scoping.
    pub actor: String,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

/// An opened workspace: resolved paths plus parsed config.
pub struct Workspace {
    pub paths: WorkspacePaths,
    pub config: BeadsConfig,
    /// The enclosing git work tree, when there is one.
    pub repo_root: Option<PathBuf>,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        let actor = resolve_actor(global.actor.as_deref());
        let db_path = global.db.as_ref().map(PathBuf::from);

        Self {
            db_path,
            actor,
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// Resolves the workspace, following redirects and env overrides.
    pub fn workspace(&self) -> Result<Workspace> {
        let beads_dir = match self.db_path {
            Some(ref p) => beads_dir::resolve_redirect(p)
                .with_context(|| format!("resolving --db {}", p.display()))?,
            None => {
                let cwd = env::current_dir()?;
                match beads_dir::find_beads_dir(&cwd) {
                    Some(dir) => dir,
                    None => bail!("no .beads directory found (run 'bd init' first)"),
                }
            }
        };

        let config = cfg::load_config(&beads_dir)?;
        let repo_root = find_repo_root(&beads_dir);
        Ok(Workspace {
            paths: WorkspacePaths::new(beads_dir),
            config,
            repo_root,
        })
    }

    /// Opens the workspace store.
    pub fn open_store(&self, workspace: &Workspace) -> Result<SqliteStore> {
        let db = workspace.paths.db_path();
        if !db.exists() {
            bail!(
                "no database at {} (run 'bd init' first)",
                db.display()
            );
        }
        Ok(SqliteStore::open(&db)?)
    }
}

/// Walks up from the `.beads` directory looking for the enclosing git
/// work tree.
fn find_repo_root(beads_dir: &Path) -> Option<PathBuf> {
    let mut current = beads_dir.parent()?;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Resolves the actor name using the priority chain.
///
/// Priority: explicit flag > BD_ACTOR env > BEADS_ACTOR env > git config
/// user.name > USER env > "unknown".
fn resolve_actor(flag_value: Option<&str>) -> String {
    // 1. Explicit flag value
    if let Some(actor) = flag_value {
        if !actor.is_empty() {
            return actor.to_string();
        }
    }

    // 2. BD_ACTOR env
    if let Ok(actor) = env::var("BD_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    // 3. BEADS_ACTOR env
    if let Ok(actor) = env::var("BEADS_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    // 4. git config user.name
    if let Ok(output) = Command::new("git").args(["config", "user.name"]).output() {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    // 5. USER env (Unix) or USERNAME env (Windows)
    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        if !user.is_empty() {
            return user;
        }
    }

    // 6. Fallback
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_actor_with_flag() {
        assert_eq!(resolve_actor(Some("alice")), "alice");
    }

    #[test]
    fn resolve_actor_empty_flag_falls_through() {
        // With empty flag, it should fall through to env/git/default
        let result = resolve_actor(Some(""));
        assert!(!result.is_empty());
    }

    #[test]
    fn resolve_actor_none_falls_through() {
        let result = resolve_actor(None);
        // Should at least return something (git user, env, or "unknown")
        assert!(!result.is_empty());
    }

    #[test]
    fn repo_root_detection() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join("project").join(".beads");
        std::fs::create_dir_all(&beads).unwrap();
        assert!(find_repo_root(&beads).is_none());

        std::fs::create_dir_all(dir.path().join("project").join(".git")).unwrap();
        let root = find_repo_root(&beads).unwrap();
        assert!(root.ends_with("project"));
    }
}
