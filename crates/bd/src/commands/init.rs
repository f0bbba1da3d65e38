//! `bd init` -- initialize a beads workspace.

use anyhow::{bail, Context, Result};

use beads_config::{beads_dir, config as cfg, BeadsConfig, WorkspacePaths};
use beads_storage::{SqliteStore, Storage};

use crate::cli::InitArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd init` command.
///
/// Creates `.beads/` under the current directory (following a redirect file
/// to the canonical location when one exists), opens the database, and
/// records the workspace prefix. Refuses when a database already exists at
/// the canonical location.
pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let local = beads_dir::ensure_beads_dir(&cwd)?;
    let canonical = beads_dir::resolve_redirect(&local)
        .context("following .beads redirect")?;
    if canonical != local {
        std::fs::create_dir_all(&canonical)?;
    }
    let paths = WorkspacePaths::new(canonical.clone());

    if paths.db_path().exists() {
        bail!(
            "a beads database already exists at {}",
            paths.db_path().display()
        );
    }

    let prefix = match args.prefix {
        Some(ref p) => p.clone(),
        None => default_prefix(&cwd),
    };

    let store = SqliteStore::open(paths.db_path())?;
    store.set_config("issue_prefix", &prefix)?;
    store.set_metadata("bd_version", env!("CARGO_PKG_VERSION"))?;
    store.set_metadata("repo_id", &prefix)?;
    store.set_metadata("clone_id", &format!("{}-{}", prefix, std::process::id()))?;

    // Seed config.yaml when absent so users have a file to edit.
    if !canonical.join(cfg::CONFIG_FILE).exists() {
        let config = BeadsConfig {
            issue_prefix: prefix.clone(),
            ..Default::default()
        };
        cfg::save_config(&canonical, &config)?;
    }

    if ctx.json {
        output_json(&serde_json::json!({
            "beads_dir": canonical.display().to_string(),
            "prefix": prefix,
        }));
    } else if !ctx.quiet {
        println!(
            "Initialized beads workspace at {} (prefix '{}')",
            canonical.display(),
            prefix
        );
    }
    Ok(())
}

/// Prefix fallback: the directory name, lowercased and trimmed to
/// label-safe characters.
fn default_prefix(cwd: &std::path::Path) -> String {
    let name = cwd
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if cleaned.is_empty() {
        "bd".to_owned()
    } else {
        cleaned
    }
}
