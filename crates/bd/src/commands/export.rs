//! `bd export` -- write the database to the JSONL journal.

use std::path::PathBuf;

use anyhow::Result;

use beads_sync::export_to_path;

use crate::cli::ExportArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd export` command.
pub fn run(ctx: &RuntimeContext, args: &ExportArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    let path = match args.output {
        Some(ref p) => PathBuf::from(p),
        None => workspace.paths.jsonl_path(),
    };
    let hash = export_to_path(&store, &path)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "path": path.display().to_string(),
            "content_hash": hash,
        }));
    } else if !ctx.quiet {
        println!("Exported to {}", path.display());
    }
    Ok(())
}
