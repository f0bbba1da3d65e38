//! `bd search` -- text search over titles and descriptions.

use anyhow::Result;

use beads_core::filter::IssueFilter;
use beads_storage::Storage;

use crate::cli::SearchArgs;
use crate::context::RuntimeContext;
use crate::output::{issue_line, output_json};

/// Execute the `bd search` command.
pub fn run(ctx: &RuntimeContext, args: &SearchArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let filter = IssueFilter {
        limit: args.limit,
        ..Default::default()
    };
    let issues = store.search_issues(&args.query, &filter)?;

    if ctx.json {
        output_json(&issues);
    } else if issues.is_empty() {
        println!("No matches for '{}'.", args.query);
    } else {
        for issue in &issues {
            println!("{}", issue_line(issue));
        }
    }
    Ok(())
}
