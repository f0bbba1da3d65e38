//! `bd dep` -- dependency management.

use anyhow::Result;

use beads_core::dependency::Dependency;
use beads_core::enums::DependencyType;
use beads_storage::Storage;

use crate::cli::{DepArgs, DepCommands};
use crate::commands::resolve_id;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd dep` command.
pub fn run(ctx: &RuntimeContext, args: &DepArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    match &args.command {
        DepCommands::Add {
            issue,
            depends_on,
            dep_type,
        } => {
            let issue = resolve_id(&store, issue)?;
            let depends_on = resolve_id(&store, depends_on)?;
            let dep = Dependency::new(
                &issue,
                &depends_on,
                DependencyType::from(dep_type.as_str()),
                &ctx.actor,
            );
            store.add_dependency(&dep, &ctx.actor)?;
            if ctx.json {
                output_json(&dep);
            } else if !ctx.quiet {
                println!("{issue} {dep_type} {depends_on}");
            }
        }
        DepCommands::Remove { issue, depends_on } => {
            let issue = resolve_id(&store, issue)?;
            let depends_on = resolve_id(&store, depends_on)?;
            store.remove_dependency(&issue, &depends_on, &ctx.actor)?;
            if !ctx.quiet && !ctx.json {
                println!("Removed {issue} -> {depends_on}");
            }
        }
        DepCommands::List { issue } => {
            let issue = resolve_id(&store, issue)?;
            let deps = store.get_dependency_records(&issue)?;
            if ctx.json {
                output_json(&deps);
            } else if deps.is_empty() {
                println!("{issue} has no dependencies.");
            } else {
                for dep in &deps {
                    println!("{} {} {}", dep.issue_id, dep.dep_type, dep.depends_on_id);
                }
            }
        }
    }
    Ok(())
}
