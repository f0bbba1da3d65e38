//! Dependency types -- relationships between beads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::DependencyType;

/// A directed edge `issue_id -> depends_on_id` with a relationship kind.
///
/// Only kinds whose [`DependencyType::affects_ready_work`] is true gate
/// readiness queries and participate in cycle detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub issue_id: String,

    pub depends_on_id: String,

    /// Dependency kind (serialised as "type" in JSON).
    #[serde(rename = "type", default)]
    pub dep_type: DependencyType,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,
}

impl Dependency {
    /// Creates a new edge with the current timestamp.
    pub fn new(
        issue_id: impl Into<String>,
        depends_on_id: impl Into<String>,
        dep_type: DependencyType,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            issue_id: issue_id.into(),
            depends_on_id: depends_on_id.into(),
            dep_type,
            created_at: Utc::now(),
            created_by: created_by.into(),
        }
    }

    /// Returns `true` if this edge points at its own source.
    pub fn is_self_edge(&self) -> bool {
        self.issue_id == self.depends_on_id
    }
}

/// Counts for dependencies and dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCounts {
    /// Number of beads this bead depends on.
    pub dependency_count: i32,
    /// Number of beads that depend on this bead.
    pub dependent_count: i32,
}
