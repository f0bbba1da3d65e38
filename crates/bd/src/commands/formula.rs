//! `bd formula` -- list, show, convert, and import workflow formulas.

use std::path::Path;

use anyhow::{bail, Result};

use beads_formula::{
    find_formula, list_formulas, load_formula, load_stored_formula, parser, save_formula,
};
use beads_storage::Storage;

use crate::cli::{FormulaArgs, FormulaCommands};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `bd formula` command.
pub fn run(ctx: &RuntimeContext, args: &FormulaArgs) -> Result<()> {
    match &args.command {
        FormulaCommands::List => {
            let workspace = ctx.workspace()?;
            let store = ctx.open_store(&workspace)?;
            let formulas = list_formulas(&store)?;
            if ctx.json {
                let rows: Vec<serde_json::Value> = formulas
                    .iter()
                    .map(|(id, name)| serde_json::json!({"id": id, "name": name}))
                    .collect();
                output_json(&rows);
            } else if formulas.is_empty() {
                println!("No stored formulas.");
            } else {
                for (id, name) in &formulas {
                    println!("{id}  {name}");
                }
            }
        }
        FormulaCommands::Show { name } => {
            let workspace = ctx.workspace()?;
            let store = ctx.open_store(&workspace)?;
            let (id, formula) = load_stored_formula(&store, name)?;
            if ctx.json {
                output_json(&formula);
            } else {
                println!("{} ({} steps, stored as {id})", formula.formula, formula.steps.len());
                if !formula.description.is_empty() {
                    println!("{}", formula.description);
                }
                for step in &formula.steps {
                    let needs = if step.needs.is_empty() {
                        String::new()
                    } else {
                        format!("  (needs {})", step.needs.join(", "))
                    };
                    println!("  {}: {}{}", step.id, step.title, needs);
                }
            }
        }
        FormulaCommands::Convert { path, to } => {
            let formula = load_formula(Path::new(path))?;
            let converted = match to.as_str() {
                "json" => parser::to_json(&formula)?,
                "toml" => parser::to_toml(&formula)?,
                other => bail!("unknown target encoding '{other}' (expected toml or json)"),
            };
            println!("{converted}");
        }
        FormulaCommands::Import { path } => {
            let workspace = ctx.workspace()?;
            let store = ctx.open_store(&workspace)?;

            let cwd = std::env::current_dir()?;
            let resolved = find_formula(path, &cwd).or_else(|_| {
                Ok::<_, anyhow::Error>(Path::new(path).to_path_buf())
            })?;
            let formula = load_formula(&resolved)?;

            let prefix = store
                .get_config("issue_prefix")
                .unwrap_or_else(|_| "bd".to_owned());
            let id = save_formula(&store, &formula, &prefix, &ctx.actor)?;

            if ctx.json {
                output_json(&serde_json::json!({"id": id, "formula": formula.formula}));
            } else if !ctx.quiet {
                println!("Stored formula '{}' as {id}", formula.formula);
            }
        }
    }
    Ok(())
}
