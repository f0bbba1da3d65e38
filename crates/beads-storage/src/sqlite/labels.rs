//! Label operations for [`SqliteStore`].

use chrono::Utc;
use rusqlite::{Connection, params};

use beads_core::enums::EventType;
use beads_core::issue::Issue;
use beads_core::validation::is_valid_label;

use crate::error::{Result, StorageError};
use crate::sqlite::issues::{emit_event, format_datetime, hydrate_issue, scan_issue, ISSUE_COLUMNS_PREFIXED};
use crate::sqlite::store::SqliteStore;

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

/// Inserts a label row without validation or events (import path).
pub(crate) fn insert_label_row(conn: &Connection, issue_id: &str, label: &str) -> Result<()> {
    if !is_valid_label(label) {
        return Err(StorageError::validation(format!(
            "invalid label '{label}': labels match [-a-zA-Z0-9_:*]+"
        )));
    }
    conn.execute(
        "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2)",
        params![issue_id, label],
    )?;
    Ok(())
}

/// Adds a label to a bead, recording a "label_added" event.
pub(crate) fn add_label_on_conn(
    conn: &Connection,
    issue_id: &str,
    label: &str,
    actor: &str,
) -> Result<()> {
    // The bead must exist; labels has no FK error message worth surfacing.
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM issues WHERE id = ?1",
            params![issue_id],
            |row| row.get::<_, i32>(0),
        )?
        > 0;
    if !exists {
        return Err(StorageError::not_found("issue", issue_id));
    }

    insert_label_row(conn, issue_id, label)?;

    let now_str = format_datetime(&Utc::now());
    emit_event(
        conn,
        issue_id,
        EventType::LabelAdded,
        actor,
        None,
        Some(label),
        None,
        &now_str,
    )?;
    Ok(())
}

/// Removes a label from a bead, recording a "label_removed" event.
pub(crate) fn remove_label_on_conn(
    conn: &Connection,
    issue_id: &str,
    label: &str,
    actor: &str,
) -> Result<()> {
    let affected = conn.execute(
        "DELETE FROM labels WHERE issue_id = ?1 AND label = ?2",
        params![issue_id, label],
    )?;
    if affected == 0 {
        return Err(StorageError::not_found(
            "label",
            format!("{issue_id}:{label}"),
        ));
    }

    let now_str = format_datetime(&Utc::now());
    emit_event(
        conn,
        issue_id,
        EventType::LabelRemoved,
        actor,
        Some(label),
        None,
        None,
        &now_str,
    )?;
    Ok(())
}

/// Returns the sorted label set of a bead.
pub(crate) fn get_labels_on_conn(conn: &Connection, issue_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT label FROM labels WHERE issue_id = ?1 ORDER BY label")?;
    let rows = stmt.query_map(params![issue_id], |row| row.get::<_, String>(0))?;

    let mut labels = Vec::new();
    for row in rows {
        labels.push(row?);
    }
    Ok(labels)
}

/// Replaces the full label set of a bead (import path, no events).
pub(crate) fn set_labels_on_conn(
    conn: &Connection,
    issue_id: &str,
    labels: &[String],
) -> Result<()> {
    conn.execute("DELETE FROM labels WHERE issue_id = ?1", params![issue_id])?;
    let mut seen = std::collections::HashSet::new();
    for label in labels {
        if seen.insert(label.as_str()) {
            insert_label_row(conn, issue_id, label)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn add_label_impl(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        add_label_on_conn(&conn, issue_id, label, actor)
    }

    pub fn remove_label_impl(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        remove_label_on_conn(&conn, issue_id, label, actor)
    }

    pub fn get_labels_impl(&self, issue_id: &str) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        get_labels_on_conn(&conn, issue_id)
    }

    pub fn get_issues_by_label_impl(&self, label: &str) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ISSUE_COLUMNS_PREFIXED} FROM issues
             JOIN labels ON labels.issue_id = issues.id
             WHERE labels.label = ?1 AND issues.status != 'tombstone'
             ORDER BY issues.priority ASC, issues.created_at ASC"
        ))?;
        let rows = stmt.query_map(params![label], scan_issue)?;

        let mut issues = Vec::new();
        for row in rows {
            let mut issue = row?;
            hydrate_issue(&conn, &mut issue)?;
            issues.push(issue);
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;

    fn store_with_issue(id: &str) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let issue = IssueBuilder::new("Labeled").id(id).build();
        store.create_issue_impl(&issue, "alice").unwrap();
        store
    }

    #[test]
    fn add_and_get_labels() {
        let store = store_with_issue("bd-l1");
        store.add_label_impl("bd-l1", "backend", "alice").unwrap();
        store.add_label_impl("bd-l1", "team:core", "alice").unwrap();

        let labels = store.get_labels_impl("bd-l1").unwrap();
        assert_eq!(labels, vec!["backend".to_string(), "team:core".to_string()]);
    }

    #[test]
    fn labels_are_a_set() {
        let store = store_with_issue("bd-l2");
        store.add_label_impl("bd-l2", "dup", "alice").unwrap();
        store.add_label_impl("bd-l2", "dup", "alice").unwrap();
        assert_eq!(store.get_labels_impl("bd-l2").unwrap().len(), 1);
    }

    #[test]
    fn invalid_label_rejected() {
        let store = store_with_issue("bd-l3");
        let err = store.add_label_impl("bd-l3", "has space", "alice").unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));
    }

    #[test]
    fn label_on_missing_issue() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.add_label_impl("bd-none", "x", "alice").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn remove_label() {
        let store = store_with_issue("bd-l4");
        store.add_label_impl("bd-l4", "temp", "alice").unwrap();
        store.remove_label_impl("bd-l4", "temp", "alice").unwrap();
        assert!(store.get_labels_impl("bd-l4").unwrap().is_empty());

        let err = store.remove_label_impl("bd-l4", "temp", "alice").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn issues_by_label() {
        let store = store_with_issue("bd-l5");
        store.add_label_impl("bd-l5", "urgent", "alice").unwrap();

        let hits = store.get_issues_by_label_impl("urgent").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "bd-l5");
        assert!(store.get_issues_by_label_impl("other").unwrap().is_empty());
    }
}
