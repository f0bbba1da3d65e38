//! `bd assign` -- set the assignee on a bead.

use anyhow::Result;

use beads_storage::{IssueUpdates, Storage};

use crate::cli::AssignArgs;
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd assign` command.
pub fn run(ctx: &RuntimeContext, args: &AssignArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, &args.id)?;

    let updates = IssueUpdates {
        assignee: Some(args.assignee.clone()),
        ..Default::default()
    };
    store.update_issue(&id, &updates, &ctx.actor)?;

    if ctx.json {
        output_json(&serde_json::json!({"id": id, "assignee": args.assignee}));
    } else if !ctx.quiet {
        println!("Assigned {id} to {}", args.assignee);
    }
    Ok(())
}
