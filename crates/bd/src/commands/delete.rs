//! `bd delete` -- delete a bead and record deletion intent.
//!
//! The bead is replaced by a tombstone (the canonical deletion record for
//! the journal) and a compact marker is appended to the deletion manifest
//! so clones that have not yet seen the tombstone pick up the intent.

use anyhow::Result;
use chrono::Utc;

use beads_storage::Storage;
use beads_sync::journal_files::append_deletion;

use crate::cli::IdArg;
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd delete` command.
pub fn run(ctx: &RuntimeContext, args: &IdArg) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, &args.id)?;

    let now = Utc::now();
    let issue = store.get_issue(&id)?;
    let tombstone = issue.into_tombstone(&ctx.actor, now);
    store.run_in_transaction(&|tx| {
        tx.remove_all_dependencies(&id)?;
        tx.put_issue(&tombstone)
    })?;

    append_deletion(&workspace.paths.deletions_path(), &id, now)?;

    if ctx.json {
        output_json(&serde_json::json!({"id": id, "status": "tombstone"}));
    } else if !ctx.quiet {
        println!("Deleted {id}");
    }
    Ok(())
}
