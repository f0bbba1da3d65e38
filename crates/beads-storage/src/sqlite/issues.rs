//! Bead CRUD operations for [`SqliteStore`].

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Row, params};

use beads_core::content_hash::compute_content_hash;
use beads_core::enums::{EventType, IssueType, Status};
use beads_core::filter::IssueFilter;
use beads_core::issue::Issue;
use beads_core::schema::TypeSchema;
use beads_core::validation;

use crate::error::{Result, StorageError};
use crate::sqlite::decisions;
use crate::sqlite::dependencies;
use crate::sqlite::labels;
use crate::sqlite::store::SqliteStore;
use crate::traits::IssueUpdates;

// ---------------------------------------------------------------------------
// Column list (shared between INSERT and SELECT)
// ---------------------------------------------------------------------------

/// All issue columns in a deterministic order for SELECT queries.
pub(crate) const ISSUE_COLUMNS: &str = r#"
    id, content_hash, export_hash, title, description, design,
    status, priority, issue_type, assignee,
    created_at, created_by, updated_at, closed_at, close_reason,
    deleted_at, deleted_by,
    external_ref, metadata,
    await_type, timeout_ns
"#;

/// Same as [`ISSUE_COLUMNS`] but prefixed with `issues.` for JOIN queries.
pub(crate) const ISSUE_COLUMNS_PREFIXED: &str = r#"
    issues.id, issues.content_hash, issues.export_hash, issues.title, issues.description, issues.design,
    issues.status, issues.priority, issues.issue_type, issues.assignee,
    issues.created_at, issues.created_by, issues.updated_at, issues.closed_at, issues.close_reason,
    issues.deleted_at, issues.deleted_by,
    issues.external_ref, issues.metadata,
    issues.await_type, issues.timeout_ns
"#;

// ---------------------------------------------------------------------------
// Row scanning
// ---------------------------------------------------------------------------

/// Deserialises a row into an [`Issue`].
///
/// The column order MUST match [`ISSUE_COLUMNS`]. Relational data (labels,
/// dependencies, decision point) is populated separately by `hydrate_issue`.
pub(crate) fn scan_issue(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let id: String = row.get("id")?;
    let content_hash: String = row.get("content_hash")?;
    let title: String = row.get("title")?;
    let description: String = row.get("description")?;
    let design: String = row.get("design")?;

    let status_str: String = row.get("status")?;
    let priority: i32 = row.get("priority")?;
    let issue_type_str: String = row.get("issue_type")?;
    let assignee: String = row.get("assignee")?;

    let created_at_str: String = row.get("created_at")?;
    let created_by: String = row.get("created_by")?;
    let updated_at_str: String = row.get("updated_at")?;
    let closed_at_str: Option<String> = row.get("closed_at")?;
    let close_reason: String = row.get("close_reason")?;
    let deleted_at_str: Option<String> = row.get("deleted_at")?;
    let deleted_by: String = row.get("deleted_by")?;

    let external_ref: Option<String> = row.get("external_ref")?;
    let metadata_str: String = row.get("metadata")?;

    let await_type: String = row.get("await_type")?;
    let timeout_ns: i64 = row.get("timeout_ns")?;

    // Parse timestamps.
    let created_at = parse_datetime(&created_at_str);
    let updated_at = parse_datetime(&updated_at_str);
    let closed_at = closed_at_str.as_deref().map(parse_datetime);
    let deleted_at = deleted_at_str.as_deref().map(parse_datetime);

    // Parse JSON metadata.
    let metadata = if metadata_str.is_empty() || metadata_str == "{}" {
        None
    } else {
        serde_json::value::RawValue::from_string(metadata_str).ok()
    };

    let timeout = if timeout_ns > 0 {
        Some(std::time::Duration::from_nanos(timeout_ns as u64))
    } else {
        None
    };

    Ok(Issue {
        id,
        content_hash,
        title,
        description,
        design,
        status: Status::from(status_str),
        priority,
        issue_type: IssueType::from(issue_type_str),
        assignee,
        created_at,
        created_by,
        updated_at,
        closed_at,
        close_reason,
        deleted_at,
        deleted_by,
        external_ref,
        metadata,
        await_type,
        timeout,
        // Populated by hydrate_issue:
        labels: Vec::new(),
        dependencies: Vec::new(),
        decision_point: None,
    })
}

/// Populates labels, dependency edges, and the decision point.
pub(crate) fn hydrate_issue(conn: &Connection, issue: &mut Issue) -> Result<()> {
    issue.labels = labels::get_labels_on_conn(conn, &issue.id)?;
    issue.dependencies = dependencies::get_dependency_records_on_conn(conn, &issue.id)?;
    issue.decision_point = decisions::get_decision_point_on_conn(conn, &issue.id)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Formats a `DateTime<Utc>` as ISO 8601 TEXT for SQLite.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parses an ISO 8601 TEXT string from SQLite into a `DateTime<Utc>`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // Try full RFC 3339 first, then common SQLite formats.
    s.parse::<DateTime<Utc>>().unwrap_or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ"))
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
            .map(|ndt| ndt.and_utc())
            .unwrap_or_else(|_| Utc::now())
    })
}

/// Loads the registered custom type names from config.
pub(crate) fn custom_types_on_conn(conn: &Connection) -> Vec<String> {
    let raw: String = conn
        .query_row(
            "SELECT value FROM config WHERE key = 'types.custom'",
            [],
            |row| row.get(0),
        )
        .unwrap_or_default();
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Loads the type schema for an issue type, if one is registered.
pub(crate) fn type_schema_on_conn(
    conn: &Connection,
    issue_type: &str,
) -> Result<Option<TypeSchema>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT schema FROM type_schemas WHERE issue_type = ?1",
            params![issue_type],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Runs the built-in rules, custom-type check, and schema check for a bead.
pub(crate) fn validate_on_conn(conn: &Connection, issue: &Issue) -> Result<()> {
    let custom_types = custom_types_on_conn(conn);
    let refs: Vec<&str> = custom_types.iter().map(String::as_str).collect();
    validation::validate_with_custom(issue, &refs)?;

    let schema = type_schema_on_conn(conn, issue.issue_type.as_str())?;
    validation::validate_against_schema(issue, schema.as_ref())?;
    Ok(())
}

/// Records an audit event on the given connection.
#[allow(clippy::too_many_arguments)]
pub(crate) fn emit_event(
    conn: &Connection,
    issue_id: &str,
    event_type: EventType,
    actor: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    comment: Option<&str>,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO events (issue_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            issue_id,
            event_type.as_str(),
            actor,
            old_value,
            new_value,
            comment,
            created_at
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Insert / upsert
// ---------------------------------------------------------------------------

/// Validates and inserts a single bead, including its label set, and emits a
/// "created" event. Duplicate IDs surface as [`StorageError::Conflict`].
pub(crate) fn insert_issue(conn: &Connection, issue: &Issue, actor: &str) -> Result<()> {
    validate_on_conn(conn, issue)?;

    let now_str = format_datetime(&Utc::now());
    write_issue_row(conn, issue, false)?;

    let mut seen = std::collections::HashSet::new();
    for label in &issue.labels {
        if seen.insert(label.as_str()) {
            labels::insert_label_row(conn, &issue.id, label)?;
        }
    }

    emit_event(
        conn,
        &issue.id,
        EventType::Created,
        actor,
        None,
        Some(&issue.title),
        None,
        &now_str,
    )?;

    Ok(())
}

/// Upserts a bead verbatim, replacing labels and decision point.
///
/// Import path: timestamps, content, and relational data come from the
/// record; no event is emitted and no schema validation runs (the source
/// workspace already validated).
pub(crate) fn put_issue_on_conn(conn: &Connection, issue: &Issue) -> Result<()> {
    write_issue_row(conn, issue, true)?;
    labels::set_labels_on_conn(conn, &issue.id, &issue.labels)?;
    if let Some(ref dp) = issue.decision_point {
        let mut dp = dp.clone();
        if dp.issue_id.is_empty() {
            dp.issue_id = issue.id.clone();
        }
        decisions::put_decision_point_on_conn(conn, &dp)?;
    }
    Ok(())
}

/// Writes the issue row itself (INSERT, or INSERT OR REPLACE when `upsert`).
fn write_issue_row(conn: &Connection, issue: &Issue, upsert: bool) -> Result<()> {
    let content_hash = compute_content_hash(issue);

    let metadata_str = issue
        .metadata
        .as_ref()
        .map(|m| m.get().to_string())
        .unwrap_or_else(|| "{}".to_string());
    let timeout_ns = issue.timeout.map(|d| d.as_nanos() as i64).unwrap_or(0);

    let created_at_str = format_datetime(&issue.created_at);
    let updated_at_str = format_datetime(&issue.updated_at);
    let closed_at_str = issue.closed_at.as_ref().map(format_datetime);
    let deleted_at_str = issue.deleted_at.as_ref().map(format_datetime);

    let verb = if upsert { "INSERT OR REPLACE" } else { "INSERT" };
    conn.execute(
        &format!(
            "{verb} INTO issues ({ISSUE_COLUMNS}) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15,
                ?16, ?17,
                ?18, ?19,
                ?20, ?21
            )"
        ),
        params![
            issue.id,                  // 1
            content_hash,              // 2
            "",                        // 3 export_hash: cleared until next export
            issue.title,               // 4
            issue.description,         // 5
            issue.design,              // 6
            issue.status.as_str(),     // 7
            issue.priority,            // 8
            issue.issue_type.as_str(), // 9
            issue.assignee,            // 10
            created_at_str,            // 11
            issue.created_by,          // 12
            updated_at_str,            // 13
            closed_at_str,             // 14
            issue.close_reason,        // 15
            deleted_at_str,            // 16
            issue.deleted_by,          // 17
            issue.external_ref,        // 18
            metadata_str,              // 19
            issue.await_type,          // 20
            timeout_ns,                // 21
        ],
    )
    .map_err(|e| StorageError::from_sqlite(e, &issue.id))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Update / close / reopen / delete
// ---------------------------------------------------------------------------

/// Applies a typed partial update, re-validates, and bumps `updated_at`.
///
/// The bump is monotonic with respect to wall clock: a patch landing within
/// the same millisecond as the previous write still moves `updated_at`
/// forward, which keeps last-writer-wins merges deterministic.
pub(crate) fn update_issue_on_conn(
    conn: &Connection,
    id: &str,
    updates: &IssueUpdates,
    actor: &str,
) -> Result<()> {
    let mut issue = get_issue_on_conn(conn, id)?;
    if issue.is_tombstone() {
        return Err(StorageError::validation(format!(
            "issue {id} is a tombstone and cannot be updated"
        )));
    }

    let old_status = issue.status.clone();

    if let Some(ref v) = updates.title {
        issue.title = v.clone();
    }
    if let Some(ref v) = updates.description {
        issue.description = v.clone();
    }
    if let Some(ref v) = updates.design {
        issue.design = v.clone();
    }
    if let Some(ref v) = updates.status {
        issue.status = v.clone();
        match issue.status {
            Status::Closed => {
                if issue.closed_at.is_none() {
                    issue.closed_at = Some(Utc::now());
                }
            }
            _ => issue.closed_at = None,
        }
    }
    if let Some(v) = updates.priority {
        issue.priority = v;
    }
    if let Some(ref v) = updates.issue_type {
        issue.issue_type = v.clone();
    }
    if let Some(ref v) = updates.assignee {
        issue.assignee = v.clone();
    }
    if let Some(ref v) = updates.external_ref {
        issue.external_ref = v.clone();
    }
    if let Some(ref v) = updates.close_reason {
        issue.close_reason = v.clone();
    }
    if let Some(ref v) = updates.metadata {
        issue.metadata = match v {
            Some(json) => Some(
                serde_json::value::RawValue::from_string(json.clone())
                    .map_err(StorageError::Serialization)?,
            ),
            None => None,
        };
    }
    if let Some(ref v) = updates.await_type {
        issue.await_type = v.clone();
    }
    if let Some(v) = updates.timeout {
        issue.timeout = v;
    }

    // Monotonic updated_at bump.
    let mut now = Utc::now();
    if now <= issue.updated_at {
        now = issue.updated_at + Duration::milliseconds(1);
    }
    issue.updated_at = now;

    validate_on_conn(conn, &issue)?;

    let content_hash = compute_content_hash(&issue);
    let metadata_str = issue
        .metadata
        .as_ref()
        .map(|m| m.get().to_string())
        .unwrap_or_else(|| "{}".to_string());
    let timeout_ns = issue.timeout.map(|d| d.as_nanos() as i64).unwrap_or(0);
    let updated_at_str = format_datetime(&issue.updated_at);
    let closed_at_str = issue.closed_at.as_ref().map(format_datetime);

    conn.execute(
        "UPDATE issues SET
            content_hash = ?2, title = ?3, description = ?4, design = ?5,
            status = ?6, priority = ?7, issue_type = ?8, assignee = ?9,
            updated_at = ?10, closed_at = ?11, close_reason = ?12,
            external_ref = ?13, metadata = ?14, await_type = ?15, timeout_ns = ?16
         WHERE id = ?1",
        params![
            id,
            content_hash,
            issue.title,
            issue.description,
            issue.design,
            issue.status.as_str(),
            issue.priority,
            issue.issue_type.as_str(),
            issue.assignee,
            updated_at_str,
            closed_at_str,
            issue.close_reason,
            issue.external_ref,
            metadata_str,
            issue.await_type,
            timeout_ns,
        ],
    )?;

    emit_event(
        conn,
        id,
        EventType::Updated,
        actor,
        Some(old_status.as_str()),
        Some(issue.status.as_str()),
        None,
        &updated_at_str,
    )?;

    Ok(())
}

/// Closes a bead and emits a "closed" event.
pub(crate) fn close_issue_on_conn(
    conn: &Connection,
    id: &str,
    reason: &str,
    actor: &str,
) -> Result<()> {
    let issue = get_issue_on_conn(conn, id)?;
    if issue.is_tombstone() {
        return Err(StorageError::validation(format!(
            "issue {id} is a tombstone and cannot be closed"
        )));
    }

    let mut now = Utc::now();
    if now <= issue.updated_at {
        now = issue.updated_at + Duration::milliseconds(1);
    }
    let now_str = format_datetime(&now);

    conn.execute(
        "UPDATE issues SET status = 'closed', closed_at = ?2, close_reason = ?3, updated_at = ?2
         WHERE id = ?1",
        params![id, now_str, reason],
    )?;

    emit_event(
        conn,
        id,
        EventType::Closed,
        actor,
        Some(issue.status.as_str()),
        Some("closed"),
        if reason.is_empty() { None } else { Some(reason) },
        &now_str,
    )?;

    Ok(())
}

/// Reopens a closed bead and emits a "reopened" event.
pub(crate) fn reopen_issue_on_conn(conn: &Connection, id: &str, actor: &str) -> Result<()> {
    let issue = get_issue_on_conn(conn, id)?;
    if issue.status != Status::Closed {
        return Err(StorageError::validation(format!(
            "issue {id} is not closed (status: {})",
            issue.status
        )));
    }

    let mut now = Utc::now();
    if now <= issue.updated_at {
        now = issue.updated_at + Duration::milliseconds(1);
    }
    let now_str = format_datetime(&now);

    conn.execute(
        "UPDATE issues SET status = 'open', closed_at = NULL, close_reason = '', updated_at = ?2
         WHERE id = ?1",
        params![id, now_str],
    )?;

    emit_event(
        conn,
        id,
        EventType::Reopened,
        actor,
        Some("closed"),
        Some("open"),
        None,
        &now_str,
    )?;

    Ok(())
}

/// Permanently deletes a bead. Labels, edges, and the decision point go with
/// it via ON DELETE CASCADE; edges pointing at the bead are removed
/// explicitly.
pub(crate) fn delete_issue_on_conn(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM dependencies WHERE depends_on_id = ?1",
        params![id],
    )?;
    let affected = conn.execute("DELETE FROM issues WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(StorageError::not_found("issue", id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches a bead by ID with relational data populated.
pub(crate) fn get_issue_on_conn(conn: &Connection, id: &str) -> Result<Issue> {
    let mut issue = conn
        .query_row(
            &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
            params![id],
            scan_issue,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("issue", id),
            other => StorageError::Query(other),
        })?;
    hydrate_issue(conn, &mut issue)?;
    Ok(issue)
}

/// Fetches a bead by its external reference.
pub(crate) fn get_issue_by_external_ref_on_conn(
    conn: &Connection,
    external_ref: &str,
) -> Result<Issue> {
    let mut issue = conn
        .query_row(
            &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE external_ref = ?1 LIMIT 1"),
            params![external_ref],
            scan_issue,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("issue", external_ref),
            other => StorageError::Query(other),
        })?;
    hydrate_issue(conn, &mut issue)?;
    Ok(issue)
}

/// Builds the WHERE clause fragments and params for an [`IssueFilter`].
fn filter_clauses(filter: &IssueFilter) -> (Vec<String>, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if !filter.include_tombstones {
        clauses.push("status != 'tombstone'".into());
    }
    if let Some(ref status) = filter.status {
        params.push(Box::new(status.as_str().to_owned()));
        clauses.push(format!("status = ?{}", params.len()));
    }
    if let Some(ref issue_type) = filter.issue_type {
        params.push(Box::new(issue_type.as_str().to_owned()));
        clauses.push(format!("issue_type = ?{}", params.len()));
    }
    if let Some(priority) = filter.priority {
        params.push(Box::new(priority));
        clauses.push(format!("priority = ?{}", params.len()));
    }
    if let Some(ref assignee) = filter.assignee {
        params.push(Box::new(assignee.clone()));
        clauses.push(format!("assignee = ?{}", params.len()));
    }
    if let Some(ref label) = filter.label {
        params.push(Box::new(label.clone()));
        clauses.push(format!(
            "id IN (SELECT issue_id FROM labels WHERE label = ?{})",
            params.len()
        ));
    }

    (clauses, params)
}

/// Lists beads matching the filter, ordered by priority then creation time.
pub(crate) fn list_issues_on_conn(conn: &Connection, filter: &IssueFilter) -> Result<Vec<Issue>> {
    let (clauses, params) = filter_clauses(filter);
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let limit_clause = filter
        .limit
        .map(|n| format!("LIMIT {n}"))
        .unwrap_or_default();

    let sql = format!(
        "SELECT {ISSUE_COLUMNS} FROM issues {where_clause}
         ORDER BY priority ASC, created_at ASC {limit_clause}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), scan_issue)?;

    let mut issues = Vec::new();
    for row in rows {
        let mut issue = row?;
        hydrate_issue(conn, &mut issue)?;
        issues.push(issue);
    }
    Ok(issues)
}

/// Case-insensitive substring search over title and description.
pub(crate) fn search_issues_on_conn(
    conn: &Connection,
    query: &str,
    filter: &IssueFilter,
) -> Result<Vec<Issue>> {
    let (mut clauses, mut params) = filter_clauses(filter);
    if !query.is_empty() {
        params.push(Box::new(format!("%{}%", query.to_lowercase())));
        clauses.push(format!(
            "(LOWER(title) LIKE ?{n} OR LOWER(description) LIKE ?{n})",
            n = params.len()
        ));
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let limit_clause = filter
        .limit
        .map(|n| format!("LIMIT {n}"))
        .unwrap_or_default();

    let sql = format!(
        "SELECT {ISSUE_COLUMNS} FROM issues {where_clause}
         ORDER BY priority ASC, created_at ASC {limit_clause}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), scan_issue)?;

    let mut issues = Vec::new();
    for row in rows {
        let mut issue = row?;
        hydrate_issue(conn, &mut issue)?;
        issues.push(issue);
    }
    Ok(issues)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn create_issue_impl(&self, issue: &Issue, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        insert_issue(&conn, issue, actor)
    }

    pub fn create_issues_impl(&self, issues: &[Issue], actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        for issue in issues {
            insert_issue(&conn, issue, actor)?;
        }
        Ok(())
    }

    pub fn get_issue_impl(&self, id: &str) -> Result<Issue> {
        let conn = self.lock_conn()?;
        get_issue_on_conn(&conn, id)
    }

    pub fn get_issue_by_external_ref_impl(&self, external_ref: &str) -> Result<Issue> {
        let conn = self.lock_conn()?;
        get_issue_by_external_ref_on_conn(&conn, external_ref)
    }

    pub fn update_issue_impl(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        update_issue_on_conn(&conn, id, updates, actor)
    }

    pub fn close_issue_impl(&self, id: &str, reason: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        close_issue_on_conn(&conn, id, reason, actor)
    }

    pub fn reopen_issue_impl(&self, id: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        reopen_issue_on_conn(&conn, id, actor)
    }

    pub fn delete_issue_impl(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        delete_issue_on_conn(&conn, id)
    }

    pub fn list_issues_impl(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        list_issues_on_conn(&conn, filter)
    }

    pub fn search_issues_impl(&self, query: &str, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        search_issues_on_conn(&conn, query, filter)
    }
}
