//! `bd create` -- create a new bead.

use anyhow::{bail, Result};

use beads_core::enums::IssueType;
use beads_core::idgen;
use beads_core::issue::IssueBuilder;
use beads_storage::Storage;

use crate::cli::CreateArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd create` command.
pub fn run(ctx: &RuntimeContext, args: &CreateArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    let mut builder = IssueBuilder::new(&args.title)
        .description(&args.description)
        .issue_type(IssueType::from(args.issue_type.as_str()))
        .priority(args.priority)
        .labels(args.label.clone())
        .created_by(&ctx.actor);
    if let Some(ref assignee) = args.assignee {
        builder = builder.assignee(assignee);
    }
    let mut issue = builder.build();

    let prefix = store
        .get_config("issue_prefix")
        .unwrap_or_else(|_| "bd".to_owned());
    let count = store.count_issues()? as usize;
    let length = idgen::compute_adaptive_length(
        count,
        idgen::adaptive_defaults::MIN_LENGTH,
        idgen::adaptive_defaults::MAX_LENGTH,
        idgen::adaptive_defaults::MAX_COLLISION_PROB,
    );

    // Hash IDs collide rarely but deterministically; retry with a fresh
    // nonce until the store accepts the insert.
    let mut created = false;
    for nonce in 0..idgen::MAX_NONCE_ATTEMPTS {
        issue.id = idgen::generate_hash_id(
            &prefix,
            &issue.title,
            &issue.description,
            &ctx.actor,
            issue.created_at,
            length,
            nonce,
        );
        match store.create_issue(&issue, &ctx.actor) {
            Ok(()) => {
                created = true;
                break;
            }
            Err(e) if e.is_conflict() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if !created {
        bail!("could not find a free ID after {} attempts", idgen::MAX_NONCE_ATTEMPTS);
    }

    if ctx.json {
        output_json(&serde_json::json!({"id": issue.id}));
    } else {
        println!("{}", issue.id);
    }
    Ok(())
}
