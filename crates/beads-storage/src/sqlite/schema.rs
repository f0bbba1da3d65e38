//! DDL statements and migrations for the SQLite schema.
//!
//! Timestamps are stored as TEXT in ISO 8601 format (SQLite has no native
//! datetime type). Booleans are stored as INTEGER (0/1). JSON blobs are TEXT.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Issues table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS issues (
        id           TEXT PRIMARY KEY,
        content_hash TEXT DEFAULT '',
        export_hash  TEXT DEFAULT '',
        title        TEXT NOT NULL,
        description  TEXT NOT NULL DEFAULT '',
        design       TEXT NOT NULL DEFAULT '',
        status       TEXT NOT NULL DEFAULT 'open',
        priority     INTEGER NOT NULL DEFAULT 2,
        issue_type   TEXT NOT NULL DEFAULT 'task',
        assignee     TEXT DEFAULT '',
        created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        created_by   TEXT DEFAULT '',
        updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        closed_at    TEXT,
        close_reason TEXT DEFAULT '',
        deleted_at   TEXT,
        deleted_by   TEXT DEFAULT '',
        external_ref TEXT,
        metadata     TEXT DEFAULT '{}',
        -- Gate fields
        await_type   TEXT DEFAULT '',
        timeout_ns   INTEGER DEFAULT 0
    )
    "#,
    // -- Indexes on issues ---------------------------------------------------
    "CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status)",
    "CREATE INDEX IF NOT EXISTS idx_issues_priority ON issues(priority)",
    "CREATE INDEX IF NOT EXISTS idx_issues_issue_type ON issues(issue_type)",
    "CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assignee)",
    "CREATE INDEX IF NOT EXISTS idx_issues_updated_at ON issues(updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_issues_external_ref ON issues(external_ref)",
    // -- Dependencies table --------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS dependencies (
        issue_id      TEXT NOT NULL,
        depends_on_id TEXT NOT NULL,
        type          TEXT NOT NULL DEFAULT 'blocks',
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        created_by    TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (issue_id, depends_on_id),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_dependencies_issue ON dependencies(issue_id)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_depends_on ON dependencies(depends_on_id)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_depends_on_type ON dependencies(depends_on_id, type)",
    // -- Labels table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS labels (
        issue_id TEXT NOT NULL,
        label    TEXT NOT NULL,
        PRIMARY KEY (issue_id, label),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_labels_label ON labels(label)",
    // -- Decision points table -----------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS decision_points (
        issue_id        TEXT PRIMARY KEY,
        prompt          TEXT NOT NULL,
        options         TEXT NOT NULL DEFAULT '[]',
        default_option  TEXT DEFAULT '',
        iteration       INTEGER DEFAULT 0,
        max_iterations  INTEGER DEFAULT 0,
        reminder_count  INTEGER DEFAULT 0,
        urgency         TEXT DEFAULT '',
        requested_by    TEXT DEFAULT '',
        created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        timeout_secs    INTEGER DEFAULT 0,
        responded_at    TEXT,
        selected_option TEXT DEFAULT '',
        response_text   TEXT DEFAULT '',
        rationale       TEXT DEFAULT '',
        guidance        TEXT DEFAULT '',
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_decision_points_requested_by ON decision_points(requested_by)",
    "CREATE INDEX IF NOT EXISTS idx_decision_points_responded_at ON decision_points(responded_at)",
    // -- Type schemas table --------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS type_schemas (
        issue_type TEXT PRIMARY KEY,
        schema     TEXT NOT NULL
    )
    "#,
    // -- Events table (audit trail) ------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id    TEXT NOT NULL,
        event_type  TEXT NOT NULL,
        actor       TEXT NOT NULL,
        old_value   TEXT,
        new_value   TEXT,
        comment     TEXT,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_events_issue ON events(issue_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at)",
    // -- Config table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    // -- Metadata table ------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Default configuration values inserted on first init.
pub const DEFAULT_CONFIG: &[(&str, &str)] = &[
    ("types.custom", "gate,formula"),
    ("sync.mode", "git-portable"),
    ("sync.export_on", "push"),
    ("sync.import_on", "pull"),
    ("deletions.auto_compact", "true"),
    ("deletions.auto_compact_threshold", "1000"),
    ("deletions.retention_days", "30"),
];

/// Schema migrations applied after initial DDL.
///
/// Each migration is a `(name, sql)` pair. Migrations are tracked in the
/// `metadata` table under the key `migration:<name>` so they run at most once.
pub const MIGRATIONS: &[(&str, &str)] = &[
    // Future migrations go here, e.g.:
    // ("001_add_foo_column", "ALTER TABLE issues ADD COLUMN foo TEXT DEFAULT ''"),
];
