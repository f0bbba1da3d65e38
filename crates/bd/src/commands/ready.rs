//! `bd ready` -- beads with no open blocking dependency.

use anyhow::Result;

use beads_storage::Storage;

use crate::cli::ListArgs;
use crate::commands::list::filter_from_args;
use crate::context::RuntimeContext;
use crate::output::{issue_line, output_json};

/// Execute the `bd ready` command.
pub fn run(ctx: &RuntimeContext, args: &ListArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let issues = store.get_ready_work(&filter_from_args(args))?;

    if ctx.json {
        output_json(&issues);
    } else if issues.is_empty() {
        println!("Nothing is ready to work on.");
    } else {
        for issue in &issues {
            println!("{}", issue_line(issue));
        }
    }
    Ok(())
}
