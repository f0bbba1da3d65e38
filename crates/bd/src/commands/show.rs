//! `bd show` -- display one bead.

use anyhow::Result;

use beads_storage::Storage;

use crate::cli::IdArg;
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::{issue_detail, output_json};

/// Execute the `bd show` command.
pub fn run(ctx: &RuntimeContext, args: &IdArg) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let id = resolve_id(&store, &args.id)?;
    let issue = store.get_issue(&id)?;

    if ctx.json {
        output_json(&issue);
    } else {
        print!("{}", issue_detail(&issue));
    }
    Ok(())
}
