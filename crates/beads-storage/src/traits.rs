//! Storage and Transaction traits -- the public API for bead persistence.
//!
//! Consumers depend on these traits rather than on concrete implementations so
//! that alternative backends (mocks, proxies, etc.) can be substituted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use beads_core::decision::DecisionPoint;
use beads_core::dependency::Dependency;
use beads_core::enums::{IssueType, Status};
use beads_core::filter::IssueFilter;
use beads_core::issue::Issue;
use beads_core::schema::TypeSchema;

use crate::error::Result;

// ---------------------------------------------------------------------------
// View / helper types
// ---------------------------------------------------------------------------

/// Typed partial-update struct for beads.
///
/// Only `Some` fields are applied; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdates {
    pub title: Option<String>,
    pub description: Option<String>,
    pub design: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<i32>,
    pub issue_type: Option<IssueType>,
    pub assignee: Option<String>,
    pub external_ref: Option<Option<String>>,
    pub close_reason: Option<String>,
    pub metadata: Option<Option<String>>,
    pub await_type: Option<String>,
    pub timeout: Option<Option<std::time::Duration>>,
}

/// A bead that is blocked, along with the count of open blockers.
#[derive(Debug, Clone)]
pub struct BlockedIssue {
    /// The blocked bead.
    pub issue: Issue,
    /// Number of open blocking dependencies.
    pub blocked_by_count: i32,
}

/// One row of the audit trail.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub issue_id: String,
    pub event_type: String,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The response payload stored by `respond_decision`.
#[derive(Debug, Clone, Default)]
pub struct DecisionResponseInput {
    pub selected_option: String,
    pub response_text: String,
    pub rationale: String,
    pub guidance: String,
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// Primary storage interface for bead persistence.
///
/// The implementation serializes writes internally (single-writer invariant);
/// readers see snapshot state. All methods return [`Result`] to propagate
/// [`StorageError`](crate::error::StorageError)s.
pub trait Storage: Send + Sync {
    // -- Issue CRUD ----------------------------------------------------------

    /// Creates a new bead (validating against its type schema) and emits a
    /// "created" event.
    fn create_issue(&self, issue: &Issue, actor: &str) -> Result<()>;

    /// Creates multiple beads in a single batch.
    fn create_issues(&self, issues: &[Issue], actor: &str) -> Result<()>;

    /// Retrieves a bead by its ID, with labels and dependencies populated.
    fn get_issue(&self, id: &str) -> Result<Issue>;

    /// Retrieves a bead by its external reference.
    fn get_issue_by_external_ref(&self, external_ref: &str) -> Result<Issue>;

    /// Applies partial updates, re-validates the type schema, bumps
    /// `updated_at` monotonically, and emits an "updated" event.
    fn update_issue(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()>;

    /// Closes a bead (status=closed, closed_at=now) and emits a "closed"
    /// event.
    fn close_issue(&self, id: &str, reason: &str, actor: &str) -> Result<()>;

    /// Reopens a closed bead and emits a "reopened" event.
    fn reopen_issue(&self, id: &str, actor: &str) -> Result<()>;

    /// Permanently deletes a bead and all its edges.
    fn delete_issue(&self, id: &str) -> Result<()>;

    /// Lists beads matching the filter, ordered by priority then age.
    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Searches beads by text query over title/description plus filter.
    fn search_issues(&self, query: &str, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Returns non-closed beads whose `updated_at` is older than `now - days`,
    /// ascending by `updated_at`.
    fn get_stale_issues(
        &self,
        days: i64,
        status: Option<Status>,
        limit: Option<usize>,
    ) -> Result<Vec<Issue>>;

    /// Returns open beads with no open ready-affecting blocker.
    fn get_ready_work(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Returns beads that have at least one open blocking dependency.
    fn get_blocked_issues(&self) -> Result<Vec<BlockedIssue>>;

    /// Total number of beads, tombstones excluded.
    fn count_issues(&self) -> Result<i64>;

    // -- Dependencies --------------------------------------------------------

    /// Adds a dependency edge; rejects self-loops and (for ready-affecting
    /// kinds) cycles.
    fn add_dependency(&self, dep: &Dependency, actor: &str) -> Result<()>;

    /// Removes a dependency edge.
    fn remove_dependency(&self, issue_id: &str, depends_on_id: &str, actor: &str) -> Result<()>;

    /// Returns raw edges originating at the bead.
    fn get_dependency_records(&self, issue_id: &str) -> Result<Vec<Dependency>>;

    /// Returns every edge in the workspace (export support).
    fn get_all_dependency_records(&self) -> Result<Vec<Dependency>>;

    /// Returns the beads the given bead depends on.
    fn get_dependencies(&self, issue_id: &str) -> Result<Vec<Issue>>;

    /// Returns the beads that depend on the given bead.
    fn get_dependents(&self, issue_id: &str) -> Result<Vec<Issue>>;

    // -- Labels --------------------------------------------------------------

    /// Adds a label to a bead (validating the label pattern).
    fn add_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()>;

    /// Removes a label from a bead.
    fn remove_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()>;

    /// Returns all labels for a bead.
    fn get_labels(&self, issue_id: &str) -> Result<Vec<String>>;

    /// Returns all beads carrying the given label.
    fn get_issues_by_label(&self, label: &str) -> Result<Vec<Issue>>;

    // -- Decision points -----------------------------------------------------

    /// Attaches a decision point to a gate bead and emits a
    /// "decision_created" event.
    fn create_decision_point(&self, dp: &DecisionPoint, actor: &str) -> Result<()>;

    /// Retrieves the decision point for a gate bead.
    fn get_decision_point(&self, issue_id: &str) -> Result<DecisionPoint>;

    /// Replaces mutable decision-point fields (iteration, reminders, ...).
    fn update_decision_point(&self, dp: &DecisionPoint) -> Result<()>;

    /// Stores a response and closes the gate bead in a single transaction,
    /// then records a "decision_responded" event. Fails if already responded.
    fn respond_decision(
        &self,
        issue_id: &str,
        response: &DecisionResponseInput,
        actor: &str,
    ) -> Result<DecisionPoint>;

    /// All decision points without a response, oldest first. Includes
    /// hook-internal gates; use [`Storage::find_pending_agent_decision`] for
    /// session-scoped lookups.
    fn list_pending_decisions(&self) -> Result<Vec<DecisionPoint>>;

    /// The most recent pending decision requested by `actor`. Never returns
    /// a decision whose requester differs from `actor`, nor one requested by
    /// the literal `stop-hook`.
    fn find_pending_agent_decision(&self, actor: &str) -> Result<Option<DecisionPoint>>;

    // -- Type schemas --------------------------------------------------------

    /// Associates a schema with an issue type.
    fn set_type_schema(&self, issue_type: &str, schema: &TypeSchema) -> Result<()>;

    /// Retrieves the schema for an issue type, if any.
    fn get_type_schema(&self, issue_type: &str) -> Result<Option<TypeSchema>>;

    /// Lists all `(type, schema)` pairs.
    fn list_type_schemas(&self) -> Result<Vec<(String, TypeSchema)>>;

    // -- Configuration and metadata ------------------------------------------

    /// Sets a configuration key-value pair.
    fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Gets a configuration value by key.
    fn get_config(&self, key: &str) -> Result<String>;

    /// Returns all configuration key-value pairs.
    fn get_all_config(&self) -> Result<HashMap<String, String>>;

    /// Sets an internal metadata key-value pair.
    fn set_metadata(&self, key: &str, value: &str) -> Result<()>;

    /// Gets an internal metadata value by key.
    fn get_metadata(&self, key: &str) -> Result<String>;

    /// Clears per-issue export hashes and the journal content hash so the
    /// next export is forced full. Used by tests and re-export paths.
    fn clear_all_export_hashes(&self) -> Result<()>;

    // -- Events --------------------------------------------------------------

    /// Returns recent audit events for a bead, newest first.
    fn get_events(&self, issue_id: &str, limit: i64) -> Result<Vec<Event>>;

    // -- Transactions --------------------------------------------------------

    /// Executes a closure within a database transaction.
    ///
    /// If the closure returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is rolled back.
    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()>;

    // -- Lifecycle -----------------------------------------------------------

    /// Closes the database connection and releases resources.
    fn close(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Transaction trait
// ---------------------------------------------------------------------------

/// Subset of [`Storage`] methods available inside a transaction.
///
/// All operations share a single database connection and are committed or
/// rolled back atomically.
pub trait Transaction {
    // -- Issue operations ----------------------------------------------------

    fn create_issue(&self, issue: &Issue, actor: &str) -> Result<()>;
    fn update_issue(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()>;
    fn close_issue(&self, id: &str, reason: &str, actor: &str) -> Result<()>;
    fn delete_issue(&self, id: &str) -> Result<()>;
    fn get_issue(&self, id: &str) -> Result<Issue>;
    /// Upserts a bead verbatim (import path: timestamps and relational data
    /// are taken from the record, not regenerated).
    fn put_issue(&self, issue: &Issue) -> Result<()>;

    // -- Dependency operations -----------------------------------------------

    fn add_dependency(&self, dep: &Dependency, actor: &str) -> Result<()>;
    fn remove_dependency(&self, issue_id: &str, depends_on_id: &str, actor: &str) -> Result<()>;
    fn get_dependency_records(&self, issue_id: &str) -> Result<Vec<Dependency>>;
    /// Removes every edge touching the bead (either endpoint).
    fn remove_all_dependencies(&self, issue_id: &str) -> Result<()>;

    // -- Label operations ----------------------------------------------------

    fn add_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()>;
    fn remove_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()>;
    fn get_labels(&self, issue_id: &str) -> Result<Vec<String>>;
    /// Replaces the full label set of a bead (import path).
    fn set_labels(&self, issue_id: &str, labels: &[String]) -> Result<()>;

    // -- Decision operations -------------------------------------------------

    fn put_decision_point(&self, dp: &DecisionPoint) -> Result<()>;
    fn get_decision_point(&self, issue_id: &str) -> Result<Option<DecisionPoint>>;

    // -- Config / metadata operations ----------------------------------------

    fn set_config(&self, key: &str, value: &str) -> Result<()>;
    fn get_config(&self, key: &str) -> Result<String>;
    fn set_metadata(&self, key: &str, value: &str) -> Result<()>;
    fn get_metadata(&self, key: &str) -> Result<String>;
}
