//! `bd type` -- define custom types and type schemas.

use anyhow::Result;

use beads_core::schema::TypeSchema;
use beads_storage::Storage;

use crate::cli::{TypeArgs, TypeCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd type` command.
pub fn run(ctx: &RuntimeContext, args: &TypeArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let store = ctx.open_store(&workspace)?;

    match &args.command {
        TypeCommands::Define { name } => {
            let mut custom: Vec<String> = store
                .get_config("types.custom")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            if !custom.iter().any(|t| t == name) {
                custom.push(name.clone());
                store.set_config("types.custom", &custom.join(","))?;
            }
            if ctx.json {
                output_json(&serde_json::json!({"custom": custom}));
            } else if !ctx.quiet {
                println!("Registered custom type '{name}'");
            }
        }
        TypeCommands::Schema {
            name,
            require_fields,
            require_labels,
        } => {
            if require_fields.is_empty() && require_labels.is_empty() {
                // Show the stored schema.
                match store.get_type_schema(name)? {
                    Some(schema) => {
                        if ctx.json {
                            output_json(&schema);
                        } else {
                            println!("Type '{name}':");
                            for field in &schema.required_fields {
                                println!("  requires field {field}");
                            }
                            for pattern in &schema.required_labels {
                                println!("  requires label {pattern}");
                            }
                        }
                    }
                    None => println!("Type '{name}' has no schema."),
                }
            } else {
                let schema = TypeSchema {
                    required_fields: require_fields.clone(),
                    required_labels: require_labels.clone(),
                };
                store.set_type_schema(name, &schema)?;
                if ctx.json {
                    output_json(&schema);
                } else if !ctx.quiet {
                    println!("Schema set for type '{name}'");
                }
            }
        }
    }
    Ok(())
}
