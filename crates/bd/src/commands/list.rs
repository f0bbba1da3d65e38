//! `bd list` -- list beads with filters.

use anyhow::Result;

use beads_core::enums::{IssueType, Status};
use beads_core::filter::IssueFilter;
use beads_storage::Storage;

use crate::cli::ListArgs;
use crate::context::RuntimeContext;
use crate::output::{issue_line, output_json};

pub(crate) fn filter_from_args(args: &ListArgs) -> IssueFilter {
    IssueFilter {
        status: args.status.as_deref().map(Status::from),
        issue_type: args.issue_type.as_deref().map(IssueType::from),
        priority: args.priority,
        assignee: args.assignee.clone(),
        label: args.label.clone(),
        include_tombstones: false,
        limit: args.limit,
    }
}

/// Execute the `bd list` command.
pub fn run(ctx: &RuntimeContext, args: &ListArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;
    let issues = store.list_issues(&filter_from_args(args))?;

    if ctx.json {
        output_json(&issues);
    } else if issues.is_empty() {
        println!("No matching beads.");
    } else {
        for issue in &issues {
            println!("{}", issue_line(issue));
        }
    }
    Ok(())
}
