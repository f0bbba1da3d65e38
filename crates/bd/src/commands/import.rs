//! `bd import` -- apply a JSONL journal against the database.

use std::path::PathBuf;

use anyhow::{bail, Result};

use beads_storage::Storage;
use beads_sync::journal_files::{deletion_manifest_ids, read_journal_file};
use beads_sync::{import_records, ImportOptions, OrphanHandling};

use crate::cli::ImportArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

fn parse_orphan_handling(raw: &str) -> Result<OrphanHandling> {
    Ok(match raw {
        "strict" => OrphanHandling::Strict,
        "resurrect" => OrphanHandling::Resurrect,
        "skip" => OrphanHandling::Skip,
        "allow" => OrphanHandling::Allow,
        other => bail!("unknown orphan handling '{other}' (expected strict, resurrect, skip, allow)"),
    })
}

/// Execute the `bd import` command.
pub fn run(ctx: &RuntimeContext, args: &ImportArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    let input = match args.input {
        Some(ref p) => PathBuf::from(p),
        None => workspace.paths.existing_jsonl_path(),
    };
    if !input.exists() {
        bail!("no journal at {} (run 'bd export' on the source side first)", input.display());
    }

    let records = read_journal_file(&input)?;
    let left_records = read_journal_file(&workspace.paths.left_snapshot_path())?;
    let deletion_ids = deletion_manifest_ids(&workspace.paths.deletions_path())?;

    let options = ImportOptions {
        dry_run: args.dry_run,
        skip_update: args.skip_update,
        strict: args.strict,
        rename_on_import: args.rename_on_import,
        clear_duplicate_external_refs: args.clear_duplicate_external_refs,
        orphan_handling: parse_orphan_handling(&args.orphan_handling)?,
        skip_prefix_validation: args.skip_prefix_validation,
        deletion_ids,
        protect_left_snapshot: true,
        prune_missing: false,
        conflict_resolution: workspace.config.sync.conflict_resolution,
        expected_prefix: store.get_config("issue_prefix").unwrap_or_default(),
        actor: ctx.actor.clone(),
    };

    let result = import_records(&store, records, &left_records, &options)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "created": result.created,
            "updated": result.updated,
            "deleted": result.deleted,
            "unchanged": result.unchanged,
            "skipped": result.skipped,
            "collisions": result.collisions.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
            "id_mapping": result.id_mapping,
            "removed_ids": result.removed_ids,
            "protected_ids": result.protected_ids,
            "skipped_dependencies": result.skipped_dependencies,
            "dry_run": args.dry_run,
        }));
    } else {
        println!(
            "{}{} created, {} updated, {} deleted, {} unchanged, {} skipped",
            if args.dry_run { "[dry-run] " } else { "" },
            result.created,
            result.updated,
            result.deleted,
            result.unchanged,
            result.skipped
        );
        if !result.collisions.is_empty() {
            println!(
                "Collisions (re-run with --rename-on-import): {}",
                result
                    .collisions
                    .iter()
                    .map(|c| c.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        if !result.protected_ids.is_empty() && !ctx.quiet {
            println!("Protected from deletion: {}", result.protected_ids.join(", "));
        }
    }
    Ok(())
}
