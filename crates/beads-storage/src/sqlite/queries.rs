//! Work and staleness queries for [`SqliteStore`].

use chrono::{Duration, Utc};
use rusqlite::params;

use beads_core::enums::Status;
use beads_core::filter::IssueFilter;
use beads_core::issue::Issue;

use crate::error::Result;
use crate::sqlite::issues::{
    format_datetime, hydrate_issue, parse_datetime, scan_issue, ISSUE_COLUMNS,
};
use crate::sqlite::store::SqliteStore;
use crate::traits::{BlockedIssue, Event};

/// SQL fragment selecting open ready-affecting blockers of the outer issue.
const OPEN_BLOCKER_EXISTS: &str = r#"
    EXISTS (
        SELECT 1 FROM dependencies d
        JOIN issues b ON b.id = d.depends_on_id
        WHERE d.issue_id = issues.id
          AND d.type IN ('blocks', 'parent-child')
          AND b.status NOT IN ('closed', 'tombstone')
    )
"#;

impl SqliteStore {
    /// Returns non-closed beads whose `updated_at` is older than `now - days`,
    /// ascending by `updated_at`.
    pub fn get_stale_issues_impl(
        &self,
        days: i64,
        status: Option<Status>,
        limit: Option<usize>,
    ) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        let cutoff = format_datetime(&(Utc::now() - Duration::days(days)));

        let mut sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
             WHERE status NOT IN ('closed', 'tombstone') AND updated_at < ?1"
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(cutoff)];
        if let Some(ref s) = status {
            params_vec.push(Box::new(s.as_str().to_owned()));
            sql.push_str(" AND status = ?2");
        }
        sql.push_str(" ORDER BY updated_at ASC");
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), scan_issue)?;

        let mut issues = Vec::new();
        for row in rows {
            let mut issue = row?;
            hydrate_issue(&conn, &mut issue)?;
            issues.push(issue);
        }
        Ok(issues)
    }

    /// Returns open beads with no open ready-affecting blocker.
    pub fn get_ready_work_impl(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;

        let mut sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues
             WHERE status = 'open' AND NOT {OPEN_BLOCKER_EXISTS}"
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(ref assignee) = filter.assignee {
            params_vec.push(Box::new(assignee.clone()));
            sql.push_str(&format!(" AND assignee = ?{}", params_vec.len()));
        }
        if let Some(ref issue_type) = filter.issue_type {
            params_vec.push(Box::new(issue_type.as_str().to_owned()));
            sql.push_str(&format!(" AND issue_type = ?{}", params_vec.len()));
        }
        sql.push_str(" ORDER BY priority ASC, created_at ASC");
        if let Some(n) = filter.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), scan_issue)?;

        let mut issues = Vec::new();
        for row in rows {
            let mut issue = row?;
            hydrate_issue(&conn, &mut issue)?;
            issues.push(issue);
        }
        Ok(issues)
    }

    /// Returns beads that have at least one open blocking dependency, with
    /// the open-blocker count.
    pub fn get_blocked_issues_impl(&self) -> Result<Vec<BlockedIssue>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ISSUE_COLUMNS}, (
                SELECT COUNT(*) FROM dependencies d
                JOIN issues b ON b.id = d.depends_on_id
                WHERE d.issue_id = issues.id
                  AND d.type IN ('blocks', 'parent-child')
                  AND b.status NOT IN ('closed', 'tombstone')
             ) AS blocker_count
             FROM issues
             WHERE status NOT IN ('closed', 'tombstone') AND {OPEN_BLOCKER_EXISTS}
             ORDER BY priority ASC, created_at ASC"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let issue = scan_issue(row)?;
            let count: i32 = row.get("blocker_count")?;
            Ok((issue, count))
        })?;

        let mut blocked = Vec::new();
        for row in rows {
            let (mut issue, blocked_by_count) = row?;
            hydrate_issue(&conn, &mut issue)?;
            blocked.push(BlockedIssue {
                issue,
                blocked_by_count,
            });
        }
        Ok(blocked)
    }

    /// Total number of beads, tombstones excluded.
    pub fn count_issues_impl(&self) -> Result<i64> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE status != 'tombstone'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Returns recent audit events for a bead, newest first.
    pub fn get_events_impl(&self, issue_id: &str, limit: i64) -> Result<Vec<Event>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, issue_id, event_type, actor, old_value, new_value, comment, created_at
             FROM events WHERE issue_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![issue_id, limit], |row| {
            Ok(Event {
                id: row.get("id")?,
                issue_id: row.get("issue_id")?,
                event_type: row.get("event_type")?,
                actor: row.get("actor")?,
                old_value: row.get("old_value")?,
                new_value: row.get("new_value")?,
                comment: row.get("comment")?,
                created_at: parse_datetime(&row.get::<_, String>("created_at")?),
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::dependency::Dependency;
    use beads_core::enums::DependencyType;
    use beads_core::issue::IssueBuilder;
    use crate::sqlite::issues;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create(store: &SqliteStore, id: &str, title: &str) {
        let issue = IssueBuilder::new(title).id(id).build();
        store.create_issue_impl(&issue, "alice").unwrap();
    }

    #[test]
    fn ready_work_excludes_blocked() {
        let store = test_store();
        create(&store, "bd-r1", "Blocker");
        create(&store, "bd-r2", "Blocked");
        store
            .add_dependency_impl(
                &Dependency::new("bd-r2", "bd-r1", DependencyType::Blocks, "alice"),
                "alice",
            )
            .unwrap();

        let ready = store.get_ready_work_impl(&IssueFilter::all()).unwrap();
        let ids: Vec<&str> = ready.iter().map(|i| i.id.as_str()).collect();
        assert!(ids.contains(&"bd-r1"));
        assert!(!ids.contains(&"bd-r2"));
    }

    #[test]
    fn closing_blocker_frees_dependent() {
        let store = test_store();
        create(&store, "bd-r3", "Blocker");
        create(&store, "bd-r4", "Blocked");
        store
            .add_dependency_impl(
                &Dependency::new("bd-r4", "bd-r3", DependencyType::ParentChild, "alice"),
                "alice",
            )
            .unwrap();
        store.close_issue_impl("bd-r3", "done", "alice").unwrap();

        let ready = store.get_ready_work_impl(&IssueFilter::all()).unwrap();
        let ids: Vec<&str> = ready.iter().map(|i| i.id.as_str()).collect();
        assert!(ids.contains(&"bd-r4"));
    }

    #[test]
    fn related_edges_do_not_block() {
        let store = test_store();
        create(&store, "bd-r5", "Source");
        create(&store, "bd-r6", "Target");
        store
            .add_dependency_impl(
                &Dependency::new("bd-r5", "bd-r6", DependencyType::Related, "alice"),
                "alice",
            )
            .unwrap();

        let ready = store.get_ready_work_impl(&IssueFilter::all()).unwrap();
        assert_eq!(ready.len(), 2);
    }

    #[test]
    fn blocked_issues_with_count() {
        let store = test_store();
        create(&store, "bd-b1", "Blocker one");
        create(&store, "bd-b2", "Blocker two");
        create(&store, "bd-b3", "Doubly blocked");
        for blocker in ["bd-b1", "bd-b2"] {
            store
                .add_dependency_impl(
                    &Dependency::new("bd-b3", blocker, DependencyType::Blocks, "alice"),
                    "alice",
                )
                .unwrap();
        }

        let blocked = store.get_blocked_issues_impl().unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].issue.id, "bd-b3");
        assert_eq!(blocked[0].blocked_by_count, 2);
    }

    #[test]
    fn stale_issues_sorted_ascending() {
        let store = test_store();
        // Two old issues with distinct ages, one fresh.
        let old = Utc::now() - Duration::days(30);
        let older = Utc::now() - Duration::days(60);
        {
            let conn = store.lock_conn().unwrap();
            for (id, ts) in [("bd-s1", old), ("bd-s2", older)] {
                let issue = IssueBuilder::new("Stale")
                    .id(id)
                    .created_at(ts)
                    .updated_at(ts)
                    .build();
                issues::put_issue_on_conn(&conn, &issue).unwrap();
            }
        }
        create(&store, "bd-s3", "Fresh");

        let stale = store.get_stale_issues_impl(7, None, None).unwrap();
        let ids: Vec<&str> = stale.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["bd-s2", "bd-s1"]);

        let limited = store.get_stale_issues_impl(7, None, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, "bd-s2");
    }

    #[test]
    fn stale_ignores_closed() {
        let store = test_store();
        let old = Utc::now() - Duration::days(30);
        {
            let conn = store.lock_conn().unwrap();
            let issue = IssueBuilder::new("Old but closed")
                .id("bd-s4")
                .status(Status::Closed)
                .closed_at(old)
                .created_at(old)
                .updated_at(old)
                .build();
            issues::put_issue_on_conn(&conn, &issue).unwrap();
        }
        assert!(store.get_stale_issues_impl(7, None, None).unwrap().is_empty());
    }

    #[test]
    fn count_excludes_tombstones() {
        let store = test_store();
        create(&store, "bd-c1", "Live");
        {
            let conn = store.lock_conn().unwrap();
            let ts = IssueBuilder::new("Dead")
                .id("bd-c2")
                .build()
                .into_tombstone("alice", Utc::now());
            issues::put_issue_on_conn(&conn, &ts).unwrap();
        }
        assert_eq!(store.count_issues_impl().unwrap(), 1);
    }

    #[test]
    fn events_recorded_newest_first() {
        let store = test_store();
        create(&store, "bd-e1", "Event source");
        store.add_label_impl("bd-e1", "x", "alice").unwrap();
        store.close_issue_impl("bd-e1", "done", "alice").unwrap();

        let events = store.get_events_impl("bd-e1", 10).unwrap();
        assert!(events.len() >= 3);
        assert_eq!(events[0].event_type, "closed");
        assert_eq!(events.last().unwrap().event_type, "created");
    }
}
