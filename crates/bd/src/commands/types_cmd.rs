//! `bd types` -- list built-in and custom issue types.

use anyhow::Result;

use beads_storage::Storage;

use crate::context::RuntimeContext;
use crate::output::output_json;

/// The closed set of built-in types.
pub const BUILTIN_TYPES: &[&str] = &["task", "bug", "feature", "chore", "epic"];

/// Execute the `bd types` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    let custom: Vec<String> = store
        .get_config("types.custom")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if ctx.json {
        output_json(&serde_json::json!({
            "builtin": BUILTIN_TYPES,
            "custom": custom,
        }));
    } else {
        println!("Built-in: {}", BUILTIN_TYPES.join(", "));
        if custom.is_empty() {
            println!("Custom: (none)");
        } else {
            println!("Custom: {}", custom.join(", "));
        }
    }
    Ok(())
}
