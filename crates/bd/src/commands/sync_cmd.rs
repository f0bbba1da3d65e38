//! `bd sync` -- run a sync cycle; inspect or set the sync mode.

use anyhow::Result;

use beads_config::{config as cfg, SyncMode};
use beads_storage::Storage;
use beads_sync::sync_cycle;

use crate::cli::{SyncArgs, SyncCommands, SyncModeCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd sync` command.
pub fn run(ctx: &RuntimeContext, args: &SyncArgs) -> Result<()> {
    match &args.command {
        None => run_cycle(ctx),
        Some(SyncCommands::Mode(mode_args)) => match &mode_args.command {
            SyncModeCommands::List => {
                if ctx.json {
                    let modes: Vec<&str> = SyncMode::all().iter().map(|m| m.as_str()).collect();
                    output_json(&modes);
                } else {
                    for mode in SyncMode::all() {
                        println!("{mode}");
                    }
                }
                Ok(())
            }
            SyncModeCommands::Current => {
                let workspace = ctx.workspace()?;
                let mode = workspace.config.sync.mode;
                if ctx.json {
                    output_json(&serde_json::json!({"mode": mode.as_str()}));
                } else {
                    println!("{mode}");
                }
                Ok(())
            }
            SyncModeCommands::Set { mode } => {
                let mode = SyncMode::parse(mode)?;
                let workspace = ctx.workspace()?;
                let mut config = workspace.config.clone();
                config.sync.mode = mode;
                cfg::save_config(&workspace.paths.beads_dir, &config)?;

                // Mirror into the store so the daemon and journal agree.
                let store = ctx.open_store(&workspace)?;
                store.set_config("sync.mode", mode.as_str())?;

                if !ctx.quiet && !ctx.json {
                    println!("sync.mode = {mode}");
                }
                Ok(())
            }
        },
    }
}

fn run_cycle(ctx: &RuntimeContext) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    let outcome = sync_cycle(
        &store,
        &workspace.paths,
        &workspace.config,
        workspace.repo_root.as_deref(),
        &ctx.actor,
    )?;

    if ctx.json {
        output_json(&serde_json::json!({
            "imported": outcome.imported.as_ref().map(|r| serde_json::json!({
                "created": r.created,
                "updated": r.updated,
                "deleted": r.deleted,
                "unchanged": r.unchanged,
            })),
            "exported": outcome.exported,
            "committed": outcome.committed,
            "export_skipped_reason": outcome.export_skipped_reason,
        }));
    } else if !ctx.quiet {
        if let Some(ref imported) = outcome.imported {
            println!(
                "Imported: {} created, {} updated, {} deleted, {} unchanged",
                imported.created, imported.updated, imported.deleted, imported.unchanged
            );
        }
        if outcome.exported {
            println!("Exported journal.");
        } else if let Some(ref reason) = outcome.export_skipped_reason {
            println!("Export skipped: {reason}");
        }
        if outcome.committed {
            println!("Committed journal to git.");
        }
    }
    Ok(())
}
