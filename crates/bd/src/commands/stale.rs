//! `bd stale` -- beads untouched for N days.

use anyhow::Result;

use beads_core::enums::Status;
use beads_storage::Storage;

use crate::cli::StaleArgs;
use crate::context::RuntimeContext;
use crate::output::{issue_line, output_json};

/// Execute the `bd stale` command.
pub fn run(ctx: &RuntimeContext, args: &StaleArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let status = args.status.as_deref().map(Status::from);
    let issues = store.get_stale_issues(args.days, status, args.limit)?;

    if ctx.json {
        output_json(&issues);
    } else if issues.is_empty() {
        println!("No beads older than {} days.", args.days);
    } else {
        for issue in &issues {
            println!("{}  (updated {})", issue_line(issue), issue.updated_at.to_rfc3339());
        }
    }
    Ok(())
}
