//! Persisting formulas as beads.
//!
//! A stored formula is a bead of type `formula` whose metadata carries the
//! formula body; the bead title is the formula name. Storage keeps formulas
//! mergeable and git-portable like every other bead.

use beads_core::enums::{IssueType, FORMULA_TYPE};
use beads_core::filter::IssueFilter;
use beads_core::idgen;
use beads_core::issue::{Issue, IssueBuilder};
use beads_storage::Storage;

use crate::parser::to_json;
use crate::types::{Formula, FormulaError};

/// Saves (or replaces) a formula as a bead of type `formula`.
///
/// Returns the bead ID holding the formula.
pub fn save_formula(
    store: &dyn Storage,
    formula: &Formula,
    prefix: &str,
    actor: &str,
) -> Result<String, FormulaError> {
    let body = to_json(formula)?;

    // Replace an existing bead for the same formula name.
    if let Ok(existing) = load_stored_formula(store, &formula.formula) {
        let updates = beads_storage::IssueUpdates {
            description: Some(formula.description.clone()),
            metadata: Some(Some(body)),
            ..Default::default()
        };
        store.update_issue(&existing.0, &updates, actor)?;
        return Ok(existing.0);
    }

    let now = chrono::Utc::now();
    let count = store.count_issues()? as usize;
    let length = idgen::compute_adaptive_length(
        count,
        idgen::adaptive_defaults::MIN_LENGTH,
        idgen::adaptive_defaults::MAX_LENGTH,
        idgen::adaptive_defaults::MAX_COLLISION_PROB,
    );

    let mut last_err = None;
    for nonce in 0..idgen::MAX_NONCE_ATTEMPTS {
        let id = idgen::generate_hash_id(
            prefix,
            &formula.formula,
            &formula.description,
            actor,
            now,
            length,
            nonce,
        );
        let issue = formula_bead(&id, formula, &body, actor);
        match store.create_issue(&issue, actor) {
            Ok(()) => return Ok(id),
            Err(e) if e.is_conflict() => {
                last_err = Some(e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(last_err
        .map(FormulaError::Storage)
        .unwrap_or_else(|| FormulaError::Parse("id generation exhausted".into())))
}

fn formula_bead(id: &str, formula: &Formula, body: &str, actor: &str) -> Issue {
    let mut issue = IssueBuilder::new(&formula.formula)
        .id(id)
        .issue_type(IssueType::Custom(FORMULA_TYPE.into()))
        .description(formula.description.clone())
        .created_by(actor)
        .build();
    issue.metadata = serde_json::value::RawValue::from_string(body.to_owned()).ok();
    issue
}

/// Lists stored formulas as `(bead_id, formula_name)` pairs.
pub fn list_formulas(store: &dyn Storage) -> Result<Vec<(String, String)>, FormulaError> {
    let filter = IssueFilter {
        issue_type: Some(IssueType::Custom(FORMULA_TYPE.into())),
        ..Default::default()
    };
    let issues = store.list_issues(&filter)?;
    Ok(issues.into_iter().map(|i| (i.id, i.title)).collect())
}

/// Loads a stored formula by name. Returns the bead ID and the parsed body.
pub fn load_stored_formula(
    store: &dyn Storage,
    name: &str,
) -> Result<(String, Formula), FormulaError> {
    let filter = IssueFilter {
        issue_type: Some(IssueType::Custom(FORMULA_TYPE.into())),
        ..Default::default()
    };
    let issue = store
        .list_issues(&filter)?
        .into_iter()
        .find(|i| i.title == name)
        .ok_or_else(|| FormulaError::NotFound(name.to_owned()))?;
    let formula = formula_from_issue(&issue)?;
    Ok((issue.id, formula))
}

/// Decodes the formula body carried in a bead's metadata.
pub fn formula_from_issue(issue: &Issue) -> Result<Formula, FormulaError> {
    let raw = issue
        .metadata
        .as_ref()
        .ok_or_else(|| FormulaError::Parse(format!("bead {} has no formula body", issue.id)))?;
    crate::parser::parse_json(raw.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_toml;
    use beads_storage::SqliteStore;

    const SRC: &str = r#"
formula = "release"
description = "Cut a release"

[[steps]]
id = "tag"
title = "Tag it"
"#;

    #[test]
    fn save_and_load_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let formula = parse_toml(SRC).unwrap();

        let id = save_formula(&store, &formula, "bd", "alice").unwrap();
        assert!(id.starts_with("bd-"));

        let (loaded_id, loaded) = load_stored_formula(&store, "release").unwrap();
        assert_eq!(loaded_id, id);
        assert_eq!(loaded.formula, "release");
        assert_eq!(loaded.steps.len(), 1);
    }

    #[test]
    fn save_replaces_same_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut formula = parse_toml(SRC).unwrap();

        let first = save_formula(&store, &formula, "bd", "alice").unwrap();
        formula.description = "Updated description".into();
        let second = save_formula(&store, &formula, "bd", "alice").unwrap();
        assert_eq!(first, second);

        let (_, loaded) = load_stored_formula(&store, "release").unwrap();
        assert_eq!(loaded.description, "Updated description");
        assert_eq!(list_formulas(&store).unwrap().len(), 1);
    }

    #[test]
    fn list_only_formula_beads() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .create_issue(
                &IssueBuilder::new("Plain task").id("bd-task1").build(),
                "alice",
            )
            .unwrap();
        let formula = parse_toml(SRC).unwrap();
        save_formula(&store, &formula, "bd", "alice").unwrap();

        let formulas = list_formulas(&store).unwrap();
        assert_eq!(formulas.len(), 1);
        assert_eq!(formulas[0].1, "release");
    }

    #[test]
    fn missing_formula_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            load_stored_formula(&store, "ghost"),
            Err(FormulaError::NotFound(_))
        ));
    }
}
