//! Decision points -- human-in-the-loop gates attached 1:1 to gate beads.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Requester tag reserved for hook-internal stop-check gates.
///
/// Decisions carrying this requester are never returned by
/// pending-agent-decision queries.
pub const STOP_HOOK_REQUESTER: &str = "stop-hook";

/// One selectable option of a decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Stable option identifier (e.g. "option-a").
    pub id: String,

    /// One-word shorthand usable on the command line.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short: String,

    /// Human-readable label.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

/// Logical state of a decision point.
///
/// Derived from stored fields, never persisted directly: `responded_at`
/// drives `Responded`, and `created_at + timeout` drives `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionState {
    Pending,
    Responded,
    Expired,
}

/// A decision point record, attached to a gate bead by `issue_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    /// ID of the gate bead this decision belongs to.
    #[serde(default)]
    pub issue_id: String,

    /// The question put to the human.
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<DecisionOption>,

    /// Option id selected when the human does not answer in time.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_option: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub iteration: i32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_iterations: i32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub reminder_count: i32,

    /// Free-form urgency hint (e.g. "high").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub urgency: String,

    /// Actor that created the decision; used for session scoping.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requested_by: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Seconds after `created_at` at which the decision logically expires.
    /// Zero means no timeout.
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub timeout_secs: i64,

    // -- Response fields -----------------------------------------------------
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub selected_option: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response_text: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rationale: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub guidance: String,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

impl DecisionPoint {
    /// Creates a pending decision point for the given gate bead.
    pub fn new(issue_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            issue_id: issue_id.into(),
            prompt: prompt.into(),
            options: Vec::new(),
            default_option: String::new(),
            iteration: 0,
            max_iterations: 0,
            reminder_count: 0,
            urgency: String::new(),
            requested_by: String::new(),
            created_at: Utc::now(),
            timeout_secs: 0,
            responded_at: None,
            selected_option: String::new(),
            response_text: String::new(),
            rationale: String::new(),
            guidance: String::new(),
        }
    }

    /// Returns `true` once a response has been stored.
    pub fn is_responded(&self) -> bool {
        self.responded_at.is_some()
    }

    /// Returns `true` if the decision is past its timeout at `now`.
    ///
    /// Expired decisions stay queryable; they only stop waking pollers.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.is_responded() || self.timeout_secs == 0 {
            return false;
        }
        now - self.created_at > Duration::seconds(self.timeout_secs)
    }

    /// Computes the logical state at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> DecisionState {
        if self.is_responded() {
            DecisionState::Responded
        } else if self.is_expired(now) {
            DecisionState::Expired
        } else {
            DecisionState::Pending
        }
    }

    /// Returns `true` if this is a hook-internal stop-check gate.
    pub fn is_stop_hook(&self) -> bool {
        self.requested_by == STOP_HOOK_REQUESTER
    }

    /// Looks up an option by id or shorthand.
    pub fn find_option(&self, key: &str) -> Option<&DecisionOption> {
        self.options
            .iter()
            .find(|o| o.id == key || (!o.short.is_empty() && o.short == key))
    }
}

/// The response a waiter receives from `wait_for_decision`.
///
/// An empty response (both fields empty) signals timeout, cancellation, or
/// expiry -- never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub selected_option: String,
    pub response_text: String,
}

impl DecisionResponse {
    /// Returns `true` when no response was obtained.
    pub fn is_empty(&self) -> bool {
        self.selected_option.is_empty() && self.response_text.is_empty()
    }
}
