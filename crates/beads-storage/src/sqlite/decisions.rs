//! Decision-point operations for [`SqliteStore`].
//!
//! A decision point is attached 1:1 to a gate bead. Responding stores the
//! response and closes the gate bead inside one transaction; the daemon
//! publishes the bus event after the commit returns.

use chrono::Utc;
use rusqlite::{Connection, params};

use beads_core::decision::{DecisionOption, DecisionPoint, STOP_HOOK_REQUESTER};
use beads_core::enums::EventType;

use crate::error::{Result, StorageError};
use crate::sqlite::issues::{emit_event, format_datetime, parse_datetime};
use crate::sqlite::store::SqliteStore;
use crate::traits::DecisionResponseInput;

// ---------------------------------------------------------------------------
// Row scanning
// ---------------------------------------------------------------------------

const DECISION_COLUMNS: &str = r#"
    issue_id, prompt, options, default_option,
    iteration, max_iterations, reminder_count, urgency,
    requested_by, created_at, timeout_secs,
    responded_at, selected_option, response_text, rationale, guidance
"#;

fn scan_decision(row: &rusqlite::Row<'_>) -> rusqlite::Result<DecisionPoint> {
    let options_json: String = row.get("options")?;
    let options: Vec<DecisionOption> = serde_json::from_str(&options_json).unwrap_or_default();

    let created_at_str: String = row.get("created_at")?;
    let responded_at_str: Option<String> = row.get("responded_at")?;

    Ok(DecisionPoint {
        issue_id: row.get("issue_id")?,
        prompt: row.get("prompt")?,
        options,
        default_option: row.get("default_option")?,
        iteration: row.get("iteration")?,
        max_iterations: row.get("max_iterations")?,
        reminder_count: row.get("reminder_count")?,
        urgency: row.get("urgency")?,
        requested_by: row.get("requested_by")?,
        created_at: parse_datetime(&created_at_str),
        timeout_secs: row.get("timeout_secs")?,
        responded_at: responded_at_str.as_deref().map(parse_datetime),
        selected_option: row.get("selected_option")?,
        response_text: row.get("response_text")?,
        rationale: row.get("rationale")?,
        guidance: row.get("guidance")?,
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

/// Upserts a decision point verbatim, preserving any stored response
/// (import carryover path).
pub(crate) fn put_decision_point_on_conn(conn: &Connection, dp: &DecisionPoint) -> Result<()> {
    let options_json = serde_json::to_string(&dp.options)?;
    let created_at_str = format_datetime(&dp.created_at);
    let responded_at_str = dp.responded_at.as_ref().map(format_datetime);

    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO decision_points ({DECISION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            dp.issue_id,
            dp.prompt,
            options_json,
            dp.default_option,
            dp.iteration,
            dp.max_iterations,
            dp.reminder_count,
            dp.urgency,
            dp.requested_by,
            created_at_str,
            dp.timeout_secs,
            responded_at_str,
            dp.selected_option,
            dp.response_text,
            dp.rationale,
            dp.guidance,
        ],
    )?;
    Ok(())
}

/// Fetches the decision point for a gate bead, `None` when absent.
pub(crate) fn get_decision_point_on_conn(
    conn: &Connection,
    issue_id: &str,
) -> Result<Option<DecisionPoint>> {
    conn.query_row(
        &format!("SELECT {DECISION_COLUMNS} FROM decision_points WHERE issue_id = ?1"),
        params![issue_id],
        scan_decision,
    )
    .map(Some)
    .or_else(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(StorageError::Query(other)),
    })
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Creates a decision point for an existing gate bead.
    pub fn create_decision_point_impl(&self, dp: &DecisionPoint, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;

        // The gate bead must exist and must not already carry a decision.
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM issues WHERE id = ?1",
                params![dp.issue_id],
                |row| row.get::<_, i32>(0),
            )?
            > 0;
        if !exists {
            return Err(StorageError::not_found("issue", &dp.issue_id));
        }
        if get_decision_point_on_conn(&conn, &dp.issue_id)?.is_some() {
            return Err(StorageError::Conflict {
                id: dp.issue_id.clone(),
            });
        }

        put_decision_point_on_conn(&conn, dp)?;

        let now_str = format_datetime(&Utc::now());
        emit_event(
            &conn,
            &dp.issue_id,
            EventType::DecisionCreated,
            actor,
            None,
            Some(&dp.prompt),
            None,
            &now_str,
        )?;
        Ok(())
    }

    pub fn get_decision_point_impl(&self, issue_id: &str) -> Result<DecisionPoint> {
        let conn = self.lock_conn()?;
        get_decision_point_on_conn(&conn, issue_id)?
            .ok_or_else(|| StorageError::not_found("decision", issue_id))
    }

    /// Replaces mutable decision-point fields. Responses are written through
    /// [`SqliteStore::respond_decision_impl`] only.
    pub fn update_decision_point_impl(&self, dp: &DecisionPoint) -> Result<()> {
        let conn = self.lock_conn()?;
        if get_decision_point_on_conn(&conn, &dp.issue_id)?.is_none() {
            return Err(StorageError::not_found("decision", &dp.issue_id));
        }
        put_decision_point_on_conn(&conn, dp)
    }

    /// Stores a response and closes the gate bead atomically.
    pub fn respond_decision_impl(
        &self,
        issue_id: &str,
        response: &DecisionResponseInput,
        actor: &str,
    ) -> Result<DecisionPoint> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;

        let mut dp = get_decision_point_on_conn(&tx, issue_id)?
            .ok_or_else(|| StorageError::not_found("decision", issue_id))?;
        if dp.is_responded() {
            return Err(StorageError::validation(format!(
                "decision {issue_id} already responded at {}",
                dp.responded_at.map(|t| t.to_rfc3339()).unwrap_or_default()
            )));
        }

        // Resolve option shorthands to the stable option id.
        let selected = dp
            .find_option(&response.selected_option)
            .map(|o| o.id.clone())
            .unwrap_or_else(|| response.selected_option.clone());

        let now = Utc::now();
        let now_str = format_datetime(&now);

        dp.responded_at = Some(now);
        dp.selected_option = selected.clone();
        dp.response_text = response.response_text.clone();
        dp.rationale = response.rationale.clone();
        dp.guidance = response.guidance.clone();
        put_decision_point_on_conn(&tx, &dp)?;

        // Close the gate bead in the same transaction.
        tx.execute(
            "UPDATE issues SET status = 'closed', closed_at = ?2,
                    close_reason = 'decision responded', updated_at = ?2
             WHERE id = ?1 AND status != 'closed'",
            params![issue_id, now_str],
        )?;

        emit_event(
            &tx,
            issue_id,
            EventType::DecisionResponded,
            actor,
            None,
            Some(&selected),
            if response.response_text.is_empty() {
                None
            } else {
                Some(&response.response_text)
            },
            &now_str,
        )?;

        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(dp)
    }

    /// All decision points without a response, oldest first.
    pub fn list_pending_decisions_impl(&self) -> Result<Vec<DecisionPoint>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECISION_COLUMNS} FROM decision_points
             WHERE responded_at IS NULL
             ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map([], scan_decision)?;

        let mut decisions = Vec::new();
        for row in rows {
            decisions.push(row?);
        }
        Ok(decisions)
    }

    /// The most recent pending decision requested by `actor`, excluding
    /// hook-internal gates.
    pub fn find_pending_agent_decision_impl(&self, actor: &str) -> Result<Option<DecisionPoint>> {
        if actor == STOP_HOOK_REQUESTER {
            return Ok(None);
        }
        let conn = self.lock_conn()?;
        conn.query_row(
            &format!(
                "SELECT {DECISION_COLUMNS} FROM decision_points
                 WHERE responded_at IS NULL
                   AND requested_by = ?1
                   AND requested_by != ?2
                 ORDER BY created_at DESC
                 LIMIT 1"
            ),
            params![actor, STOP_HOOK_REQUESTER],
            scan_decision,
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(StorageError::Query(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;

    fn store_with_gate(id: &str, requester: &str) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let gate = IssueBuilder::new("Gate")
            .id(id)
            .issue_type(beads_core::enums::IssueType::Custom("gate".into()))
            .await_type("decision")
            .build();
        store.create_issue_impl(&gate, requester).unwrap();

        let mut dp = DecisionPoint::new(id, "Proceed?");
        dp.requested_by = requester.into();
        dp.options = vec![
            DecisionOption {
                id: "option-a".into(),
                short: "a".into(),
                label: "Yes".into(),
            },
            DecisionOption {
                id: "option-b".into(),
                short: "b".into(),
                label: "No".into(),
            },
        ];
        store.create_decision_point_impl(&dp, requester).unwrap();
        store
    }

    #[test]
    fn create_and_get() {
        let store = store_with_gate("bd-g1", "alice");
        let dp = store.get_decision_point_impl("bd-g1").unwrap();
        assert_eq!(dp.prompt, "Proceed?");
        assert_eq!(dp.options.len(), 2);
        assert!(!dp.is_responded());
    }

    #[test]
    fn create_requires_gate_bead() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dp = DecisionPoint::new("bd-missing", "?");
        let err = store.create_decision_point_impl(&dp, "alice").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn create_rejects_duplicate() {
        let store = store_with_gate("bd-g2", "alice");
        let dp = DecisionPoint::new("bd-g2", "Again?");
        let err = store.create_decision_point_impl(&dp, "alice").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn respond_stores_and_closes_gate() {
        let store = store_with_gate("bd-g3", "alice");
        let response = DecisionResponseInput {
            selected_option: "option-a".into(),
            response_text: "go with A".into(),
            rationale: "fastest".into(),
            guidance: String::new(),
        };
        let dp = store.respond_decision_impl("bd-g3", &response, "human").unwrap();
        assert_eq!(dp.selected_option, "option-a");
        assert!(dp.is_responded());

        // Gate bead closed in the same transaction.
        let gate = store.get_issue_impl("bd-g3").unwrap();
        assert_eq!(gate.status, beads_core::enums::Status::Closed);
        assert!(gate.closed_at.is_some());
    }

    #[test]
    fn respond_resolves_shorthand() {
        let store = store_with_gate("bd-g4", "alice");
        let response = DecisionResponseInput {
            selected_option: "b".into(),
            ..Default::default()
        };
        let dp = store.respond_decision_impl("bd-g4", &response, "human").unwrap();
        assert_eq!(dp.selected_option, "option-b");
    }

    #[test]
    fn respond_twice_fails() {
        let store = store_with_gate("bd-g5", "alice");
        let response = DecisionResponseInput {
            selected_option: "option-a".into(),
            ..Default::default()
        };
        store.respond_decision_impl("bd-g5", &response, "human").unwrap();
        let err = store
            .respond_decision_impl("bd-g5", &response, "human")
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));
    }

    #[test]
    fn pending_list_ordering() {
        let store = store_with_gate("bd-g6", "alice");
        let pending = store.list_pending_decisions_impl().unwrap();
        assert_eq!(pending.len(), 1);

        let response = DecisionResponseInput {
            selected_option: "option-a".into(),
            ..Default::default()
        };
        store.respond_decision_impl("bd-g6", &response, "human").unwrap();
        assert!(store.list_pending_decisions_impl().unwrap().is_empty());
    }

    #[test]
    fn agent_decision_scoped_by_actor() {
        let store = store_with_gate("bd-g7", "alice");

        let found = store.find_pending_agent_decision_impl("alice").unwrap();
        assert_eq!(found.unwrap().issue_id, "bd-g7");

        // Another actor never sees alice's decision.
        assert!(store.find_pending_agent_decision_impl("bob").unwrap().is_none());
    }

    #[test]
    fn stop_hook_gates_excluded() {
        let store = store_with_gate("bd-g8", STOP_HOOK_REQUESTER);
        assert!(store
            .find_pending_agent_decision_impl(STOP_HOOK_REQUESTER)
            .unwrap()
            .is_none());
        assert!(store.find_pending_agent_decision_impl("alice").unwrap().is_none());
        // But the pending list still includes it for administrative queries.
        assert_eq!(store.list_pending_decisions_impl().unwrap().len(), 1);
    }

    #[test]
    fn response_round_trips_through_put() {
        let store = store_with_gate("bd-g9", "alice");
        let response = DecisionResponseInput {
            selected_option: "option-a".into(),
            response_text: "text".into(),
            rationale: "because".into(),
            guidance: "next steps".into(),
        };
        let dp = store.respond_decision_impl("bd-g9", &response, "human").unwrap();

        // Verbatim re-put (as import carryover does) must preserve the response.
        let conn = store.lock_conn().unwrap();
        put_decision_point_on_conn(&conn, &dp).unwrap();
        let back = get_decision_point_on_conn(&conn, "bd-g9").unwrap().unwrap();
        assert_eq!(back.rationale, "because");
        assert_eq!(back.guidance, "next steps");
        assert!(back.is_responded());
    }
}
