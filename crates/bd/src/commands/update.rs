//! `bd update` -- apply field updates to a bead.

use anyhow::Result;

use beads_core::enums::{IssueType, Status};
use beads_storage::{IssueUpdates, Storage};

use crate::cli::UpdateArgs;
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd update` command.
pub fn run(ctx: &RuntimeContext, args: &UpdateArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, &args.id)?;

    let updates = IssueUpdates {
        title: args.title.clone(),
        description: args.description.clone(),
        status: args.status.as_deref().map(Status::from),
        priority: args.priority,
        issue_type: args.issue_type.as_deref().map(IssueType::from),
        assignee: args.assignee.clone(),
        external_ref: args.external_ref.clone().map(Some),
        ..Default::default()
    };
    store.update_issue(&id, &updates, &ctx.actor)?;

    if ctx.json {
        output_json(&serde_json::json!({"id": id}));
    } else if !ctx.quiet {
        println!("Updated {id}");
    }
    Ok(())
}
