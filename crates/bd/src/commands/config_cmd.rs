//! `bd config` -- get, set, and list configuration values.

use anyhow::Result;

use beads_storage::Storage;

use crate::cli::{ConfigArgs, ConfigCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd config` command.
pub fn run(ctx: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    match &args.command {
        ConfigCommands::Get { key } => {
            let value = store.get_config(key)?;
            if ctx.json {
                output_json(&serde_json::json!({"key": key, "value": value}));
            } else {
                println!("{value}");
            }
        }
        ConfigCommands::Set { key, value } => {
            store.set_config(key, value)?;
            if ctx.json {
                output_json(&serde_json::json!({"key": key, "value": value}));
            } else if !ctx.quiet {
                println!("{key} = {value}");
            }
        }
        ConfigCommands::List => {
            let all = store.get_all_config()?;
            if ctx.json {
                output_json(&all);
            } else {
                let mut keys: Vec<&String> = all.keys().collect();
                keys.sort();
                for key in keys {
                    println!("{key} = {}", all[key]);
                }
            }
        }
    }
    Ok(())
}
