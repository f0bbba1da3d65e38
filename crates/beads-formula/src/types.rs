//! Formula data model.
//!
//! Covers steps, variables (with defaults & required), and dependencies
//! between steps -- enough to round-trip formula files and persist them as
//! beads. Expansion semantics stay with the external cooking engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default formula type.
fn default_type() -> String {
    "workflow".to_string()
}

/// Default step type.
fn default_step_type() -> String {
    "task".to_string()
}

/// Default priority.
fn default_priority() -> i32 {
    2
}

/// Root structure for `.formula.json` / `.formula.toml` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    /// Unique identifier / name for this formula.
    pub formula: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Formula type: "workflow", "expansion", "aspect".
    #[serde(default = "default_type")]
    pub r#type: String,

    /// Schema version (currently 1).
    #[serde(default)]
    pub version: i32,

    /// Template variables with optional defaults and validation.
    #[serde(default)]
    pub vars: HashMap<String, VarDef>,

    /// Steps that become beads when the formula is expanded.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Where this formula was loaded from (set by the parser).
    #[serde(skip)]
    pub source: String,
}

/// Variable definition with optional default and required flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDef {
    /// What this variable is for.
    #[serde(default)]
    pub description: String,

    /// Whether the variable must be provided (no default).
    #[serde(default)]
    pub required: bool,

    /// Default value (None = no default).
    #[serde(default)]
    pub default: Option<String>,
}

/// A work-item step that becomes a bead when the formula is expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier within this formula.
    pub id: String,

    /// Bead title (supports `{{variable}}` substitution).
    pub title: String,

    /// Bead description (supports substitution).
    #[serde(default)]
    pub description: String,

    /// Issue type: "task", "bug", "feature", "epic", "chore".
    #[serde(default = "default_step_type")]
    pub r#type: String,

    /// Priority (0-4).
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Step IDs this step depends on.
    #[serde(default)]
    pub needs: Vec<String>,

    /// Default assignee (supports substitution).
    #[serde(default)]
    pub assignee: Option<String>,

    /// Labels applied to the created bead.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Errors that can occur during formula parsing and storage.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("formula '{0}' not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] beads_storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        let formula: Formula = serde_json::from_str(r#"{"formula": "release"}"#).unwrap();
        assert_eq!(formula.r#type, "workflow");
        assert!(formula.steps.is_empty());
    }

    #[test]
    fn step_defaults() {
        let step: Step =
            serde_json::from_str(r#"{"id": "s1", "title": "Do the thing"}"#).unwrap();
        assert_eq!(step.r#type, "task");
        assert_eq!(step.priority, 2);
        assert!(step.needs.is_empty());
    }
}
