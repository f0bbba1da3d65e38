//! `bd close` -- close a bead.

use anyhow::Result;

use beads_storage::Storage;

use crate::cli::CloseArgs;
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd close` command.
pub fn run(ctx: &RuntimeContext, args: &CloseArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, &args.id)?;

    store.close_issue(&id, &args.reason, &ctx.actor)?;

    if ctx.json {
        output_json(&serde_json::json!({"id": id, "status": "closed"}));
    } else if !ctx.quiet {
        println!("Closed {id}");
    }
    Ok(())
}
