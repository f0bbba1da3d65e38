//! `bd reopen` -- reopen a closed bead.

use anyhow::Result;

use beads_storage::Storage;

use crate::cli::IdArg;
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd reopen` command.
pub fn run(ctx: &RuntimeContext, args: &IdArg) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, &args.id)?;

    store.reopen_issue(&id, &ctx.actor)?;

    if ctx.json {
        output_json(&serde_json::json!({"id": id, "status": "open"}));
    } else if !ctx.quiet {
        println!("Reopened {id}");
    }
    Ok(())
}
