//! Storage engine for the beads system.
//!
//! Provides the [`Storage`] trait and a SQLite implementation ([`SqliteStore`]).

pub mod error;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience.
pub use error::StorageError;
pub use sqlite::SqliteStore;
pub use traits::{
    BlockedIssue, DecisionResponseInput, Event, IssueUpdates, Storage, Transaction,
};

// ---------------------------------------------------------------------------
// Storage trait implementation for SqliteStore
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use beads_core::decision::DecisionPoint;
use beads_core::dependency::Dependency;
use beads_core::enums::Status;
use beads_core::filter::IssueFilter;
use beads_core::issue::Issue;
use beads_core::schema::TypeSchema;

use crate::error::Result;

impl Storage for SqliteStore {
    fn create_issue(&self, issue: &Issue, actor: &str) -> Result<()> {
        self.create_issue_impl(issue, actor)
    }

    fn create_issues(&self, issues: &[Issue], actor: &str) -> Result<()> {
        self.create_issues_impl(issues, actor)
    }

    fn get_issue(&self, id: &str) -> Result<Issue> {
        self.get_issue_impl(id)
    }

    fn get_issue_by_external_ref(&self, external_ref: &str) -> Result<Issue> {
        self.get_issue_by_external_ref_impl(external_ref)
    }

    fn update_issue(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()> {
        self.update_issue_impl(id, updates, actor)
    }

    fn close_issue(&self, id: &str, reason: &str, actor: &str) -> Result<()> {
        self.close_issue_impl(id, reason, actor)
    }

    fn reopen_issue(&self, id: &str, actor: &str) -> Result<()> {
        self.reopen_issue_impl(id, actor)
    }

    fn delete_issue(&self, id: &str) -> Result<()> {
        self.delete_issue_impl(id)
    }

    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        self.list_issues_impl(filter)
    }

    fn search_issues(&self, query: &str, filter: &IssueFilter) -> Result<Vec<Issue>> {
        self.search_issues_impl(query, filter)
    }

    fn get_stale_issues(
        &self,
        days: i64,
        status: Option<Status>,
        limit: Option<usize>,
    ) -> Result<Vec<Issue>> {
        self.get_stale_issues_impl(days, status, limit)
    }

    fn get_ready_work(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        self.get_ready_work_impl(filter)
    }

    fn get_blocked_issues(&self) -> Result<Vec<BlockedIssue>> {
        self.get_blocked_issues_impl()
    }

    fn count_issues(&self) -> Result<i64> {
        self.count_issues_impl()
    }

    fn add_dependency(&self, dep: &Dependency, actor: &str) -> Result<()> {
        self.add_dependency_impl(dep, actor)
    }

    fn remove_dependency(&self, issue_id: &str, depends_on_id: &str, actor: &str) -> Result<()> {
        self.remove_dependency_impl(issue_id, depends_on_id, actor)
    }

    fn get_dependency_records(&self, issue_id: &str) -> Result<Vec<Dependency>> {
        self.get_dependency_records_impl(issue_id)
    }

    fn get_all_dependency_records(&self) -> Result<Vec<Dependency>> {
        self.get_all_dependency_records_impl()
    }

    fn get_dependencies(&self, issue_id: &str) -> Result<Vec<Issue>> {
        self.get_dependencies_impl(issue_id)
    }

    fn get_dependents(&self, issue_id: &str) -> Result<Vec<Issue>> {
        self.get_dependents_impl(issue_id)
    }

    fn add_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        self.add_label_impl(issue_id, label, actor)
    }

    fn remove_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        self.remove_label_impl(issue_id, label, actor)
    }

    fn get_labels(&self, issue_id: &str) -> Result<Vec<String>> {
        self.get_labels_impl(issue_id)
    }

    fn get_issues_by_label(&self, label: &str) -> Result<Vec<Issue>> {
        self.get_issues_by_label_impl(label)
    }

    fn create_decision_point(&self, dp: &DecisionPoint, actor: &str) -> Result<()> {
        self.create_decision_point_impl(dp, actor)
    }

    fn get_decision_point(&self, issue_id: &str) -> Result<DecisionPoint> {
        self.get_decision_point_impl(issue_id)
    }

    fn update_decision_point(&self, dp: &DecisionPoint) -> Result<()> {
        self.update_decision_point_impl(dp)
    }

    fn respond_decision(
        &self,
        issue_id: &str,
        response: &DecisionResponseInput,
        actor: &str,
    ) -> Result<DecisionPoint> {
        self.respond_decision_impl(issue_id, response, actor)
    }

    fn list_pending_decisions(&self) -> Result<Vec<DecisionPoint>> {
        self.list_pending_decisions_impl()
    }

    fn find_pending_agent_decision(&self, actor: &str) -> Result<Option<DecisionPoint>> {
        self.find_pending_agent_decision_impl(actor)
    }

    fn set_type_schema(&self, issue_type: &str, schema: &TypeSchema) -> Result<()> {
        self.set_type_schema_impl(issue_type, schema)
    }

    fn get_type_schema(&self, issue_type: &str) -> Result<Option<TypeSchema>> {
        self.get_type_schema_impl(issue_type)
    }

    fn list_type_schemas(&self) -> Result<Vec<(String, TypeSchema)>> {
        self.list_type_schemas_impl()
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.set_config_impl(key, value)
    }

    fn get_config(&self, key: &str) -> Result<String> {
        self.get_config_impl(key)
    }

    fn get_all_config(&self) -> Result<HashMap<String, String>> {
        self.get_all_config_impl()
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.set_metadata_impl(key, value)
    }

    fn get_metadata(&self, key: &str) -> Result<String> {
        self.get_metadata_impl(key)
    }

    fn clear_all_export_hashes(&self) -> Result<()> {
        self.clear_all_export_hashes_impl()
    }

    fn get_events(&self, issue_id: &str, limit: i64) -> Result<Vec<Event>> {
        self.get_events_impl(issue_id, limit)
    }

    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()> {
        self.run_in_transaction_impl(f)
    }

    fn close(&self) -> Result<()> {
        // SQLite connections are closed when the Connection is dropped.
        // The Mutex wrapper ensures thread safety.
        Ok(())
    }
}
