//! `bd label` -- label management.

use anyhow::Result;

use beads_storage::Storage;

use crate::cli::{LabelArgs, LabelCommands};
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd label` command.
pub fn run(ctx: &RuntimeContext, args: &LabelArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    match &args.command {
        LabelCommands::Add { id, label } => {
            let id = resolve_id(&store, id)?;
            store.add_label(&id, label, &ctx.actor)?;
            if ctx.json {
                output_json(&serde_json::json!({"id": id, "labels": store.get_labels(&id)?}));
            } else if !ctx.quiet {
                println!("Labeled {id} with {label}");
            }
        }
        LabelCommands::Remove { id, label } => {
            let id = resolve_id(&store, id)?;
            store.remove_label(&id, label, &ctx.actor)?;
            if !ctx.json && !ctx.quiet {
                println!("Removed {label} from {id}");
            }
        }
    }
    Ok(())
}
