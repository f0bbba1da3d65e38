//! The decision wait protocol and the agent stop-check guard.
//!
//! `wait_for_decision` presents one primitive over two transports: the
//! event bus when a handle is available, store polling otherwise. Either
//! way the bus is only a wake signal; the store read is authoritative.

use std::time::Duration;

use tracing::debug;

use beads_core::decision::DecisionResponse;
use beads_storage::{Storage, StorageError};

use crate::bus::{subjects, EventBus};

/// Tuning for one wait call.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Overall wait budget.
    pub timeout: Duration,
    /// Poll interval for the bus-less fallback.
    pub poll_interval: Duration,
    /// Delay before re-reading when an event arrives ahead of the store.
    pub settle_delay: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_millis(50),
        }
    }
}

/// Reads the authoritative response state for a decision.
///
/// `Ok(Some)` once responded; `Ok(None)` while pending or expired.
fn read_response(
    store: &dyn Storage,
    issue_id: &str,
) -> Result<Option<DecisionResponse>, StorageError> {
    let dp = store.get_decision_point(issue_id)?;
    if dp.is_responded() {
        Ok(Some(DecisionResponse {
            selected_option: dp.selected_option,
            response_text: dp.response_text,
        }))
    } else {
        Ok(None)
    }
}

/// Waits for a decision to be responded.
///
/// Returns the stored response, or an empty [`DecisionResponse`] on timeout,
/// cancellation, or expiry -- never an error for those cases. A decision
/// already past its own `timeout_secs` no longer wakes the caller.
pub async fn wait_for_decision(
    store: &dyn Storage,
    bus: Option<&EventBus>,
    issue_id: &str,
    options: &WaitOptions,
) -> Result<DecisionResponse, StorageError> {
    // Expired decisions stay queryable but return the empty result at once.
    let dp = store.get_decision_point(issue_id)?;
    if dp.is_expired(chrono::Utc::now()) {
        return Ok(DecisionResponse::default());
    }

    let deadline = tokio::time::Instant::now() + options.timeout;

    match bus {
        Some(bus) => {
            // Subscribe FIRST, then read: a response landing between the two
            // steps is caught by the read, one landing after it by the
            // subscription. No window is lost.
            let rx = bus.subscribe();

            if let Some(response) = read_response(store, issue_id)? {
                return Ok(response);
            }

            loop {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    return Ok(DecisionResponse::default());
                }
                let event =
                    match tokio::time::timeout(remaining, rx.recv_async()).await {
                        Ok(Ok(event)) => event,
                        // Timeout, or bus torn down: fall back to one last
                        // authoritative read.
                        Ok(Err(_)) | Err(_) => {
                            return Ok(read_response(store, issue_id)?.unwrap_or_default());
                        }
                    };
                if event.subject != subjects::DECISION_RESPONDED || event.issue_id != issue_id {
                    continue;
                }
                // The event is a wake signal only; the store may briefly lag
                // the publisher.
                match read_response(store, issue_id)? {
                    Some(response) => return Ok(response),
                    None => {
                        debug!(issue_id, "event ahead of store; retrying read");
                        tokio::time::sleep(options.settle_delay).await;
                        if let Some(response) = read_response(store, issue_id)? {
                            return Ok(response);
                        }
                    }
                }
            }
        }
        None => {
            // Bus unreachable: poll with identical return semantics.
            loop {
                if let Some(response) = read_response(store, issue_id)? {
                    return Ok(response);
                }
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    return Ok(DecisionResponse::default());
                }
                tokio::time::sleep(options.poll_interval.min(remaining)).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stop-check guard
// ---------------------------------------------------------------------------

/// Result of the agent stop-check guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopCheckOutcome {
    /// `true`: the agent may yield control (its own wait will block on the
    /// pending decision). `false`: block, with guidance.
    pub allow: bool,
    pub reason: String,
    /// The pending decision backing an `allow`.
    pub decision_id: Option<String>,
}

/// The pure stop-check guard.
///
/// If a pending agent decision created by `actor` exists, allow the yield;
/// otherwise block with guidance to create one. Never polls and never
/// counts hook-internal (`stop-hook`) gates, which avoids the deadlock
/// where a hook waits for a decision the blocked agent cannot create.
pub fn stop_check(store: &dyn Storage, actor: &str) -> Result<StopCheckOutcome, StorageError> {
    match store.find_pending_agent_decision(actor)? {
        Some(dp) => Ok(StopCheckOutcome {
            allow: true,
            reason: format!("pending decision {} awaits a response", dp.issue_id),
            decision_id: Some(dp.issue_id),
        }),
        None => Ok(StopCheckOutcome {
            allow: false,
            reason: format!(
                "no pending decision for '{actor}'; create a decision before yielding"
            ),
            decision_id: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusEvent;
    use beads_core::decision::{DecisionOption, DecisionPoint, STOP_HOOK_REQUESTER};
    use beads_core::enums::IssueType;
    use beads_core::issue::IssueBuilder;
    use beads_storage::{DecisionResponseInput, SqliteStore};
    use std::sync::Arc;

    fn gate_store(id: &str, requester: &str) -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let gate = IssueBuilder::new("Gate")
            .id(id)
            .issue_type(IssueType::Custom("gate".into()))
            .await_type("decision")
            .build();
        store.create_issue(&gate, requester).unwrap();
        let mut dp = DecisionPoint::new(id, "Go?");
        dp.requested_by = requester.into();
        dp.options = vec![DecisionOption {
            id: "option-a".into(),
            short: "a".into(),
            label: "Go".into(),
        }];
        store.create_decision_point(&dp, requester).unwrap();
        store
    }

    fn quick_options() -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn responded_before_wait_returns_immediately() {
        let store = gate_store("bd-w1", "alice");
        store
            .respond_decision(
                "bd-w1",
                &DecisionResponseInput {
                    selected_option: "option-a".into(),
                    response_text: "go with A".into(),
                    ..Default::default()
                },
                "human",
            )
            .unwrap();

        let bus = EventBus::new();
        let response =
            wait_for_decision(store.as_ref(), Some(&bus), "bd-w1", &quick_options())
                .await
                .unwrap();
        assert_eq!(response.selected_option, "option-a");
        assert_eq!(response.response_text, "go with A");
    }

    #[tokio::test]
    async fn event_wakes_waiter() {
        let store = gate_store("bd-w2", "alice");
        let bus = EventBus::new();

        let waiter_store = store.clone();
        let waiter_bus = bus.clone();
        let waiter = tokio::spawn(async move {
            wait_for_decision(
                waiter_store.as_ref(),
                Some(&waiter_bus),
                "bd-w2",
                &quick_options(),
            )
            .await
        });

        // Give the waiter a moment to subscribe, then respond and publish.
        tokio::time::sleep(Duration::from_millis(50)).await;
        store
            .respond_decision(
                "bd-w2",
                &DecisionResponseInput {
                    selected_option: "option-a".into(),
                    response_text: "go with A".into(),
                    ..Default::default()
                },
                "human",
            )
            .unwrap();
        bus.publish(BusEvent::new(subjects::DECISION_RESPONDED, "bd-w2", "human"));

        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response.selected_option, "option-a");
        assert_eq!(response.response_text, "go with A");
    }

    #[tokio::test]
    async fn unrelated_events_ignored() {
        let store = gate_store("bd-w3", "alice");
        let bus = EventBus::new();

        let waiter_store = store.clone();
        let waiter_bus = bus.clone();
        let waiter = tokio::spawn(async move {
            let options = WaitOptions {
                timeout: Duration::from_millis(300),
                ..quick_options()
            };
            wait_for_decision(waiter_store.as_ref(), Some(&waiter_bus), "bd-w3", &options).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        bus.publish(BusEvent::new(subjects::DECISION_RESPONDED, "bd-other", "x"));
        bus.publish(BusEvent::new(subjects::ISSUE_UPDATED, "bd-w3", "x"));

        // Never responded: empty result, no error.
        let response = waiter.await.unwrap().unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn polling_fallback_without_bus() {
        let store = gate_store("bd-w4", "alice");

        let waiter_store = store.clone();
        let waiter = tokio::spawn(async move {
            wait_for_decision(waiter_store.as_ref(), None, "bd-w4", &quick_options()).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        store
            .respond_decision(
                "bd-w4",
                &DecisionResponseInput {
                    selected_option: "option-a".into(),
                    ..Default::default()
                },
                "human",
            )
            .unwrap();

        let response = waiter.await.unwrap().unwrap();
        assert_eq!(response.selected_option, "option-a");
    }

    #[tokio::test]
    async fn timeout_returns_empty() {
        let store = gate_store("bd-w5", "alice");
        let options = WaitOptions {
            timeout: Duration::from_millis(100),
            ..quick_options()
        };
        let response = wait_for_decision(store.as_ref(), None, "bd-w5", &options)
            .await
            .unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn expired_decision_returns_empty_immediately() {
        let store = gate_store("bd-w6", "alice");
        let mut dp = store.get_decision_point("bd-w6").unwrap();
        dp.timeout_secs = 1;
        dp.created_at = chrono::Utc::now() - chrono::Duration::seconds(10);
        store.update_decision_point(&dp).unwrap();

        let start = std::time::Instant::now();
        let response = wait_for_decision(store.as_ref(), None, "bd-w6", &quick_options())
            .await
            .unwrap();
        assert!(response.is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stop_check_blocks_without_decision() {
        let store = SqliteStore::open_in_memory().unwrap();
        let outcome = stop_check(&store, "alice").unwrap();
        assert!(!outcome.allow);
        assert!(outcome.reason.contains("create a decision"));
        assert!(outcome.decision_id.is_none());
    }

    #[test]
    fn stop_check_allows_with_own_pending_decision() {
        let store = gate_store("bd-w7", "alice");
        let outcome = stop_check(store.as_ref(), "alice").unwrap();
        assert!(outcome.allow);
        assert_eq!(outcome.decision_id.as_deref(), Some("bd-w7"));
        assert!(outcome.reason.contains("bd-w7"));
    }

    #[test]
    fn stop_check_scoped_to_actor() {
        let store = gate_store("bd-w8", "alice");
        // Bob's stop-check does not see alice's decision.
        let outcome = stop_check(store.as_ref(), "bob").unwrap();
        assert!(!outcome.allow);
    }

    #[test]
    fn stop_check_never_counts_hook_gates() {
        let store = gate_store("bd-w9", STOP_HOOK_REQUESTER);
        let outcome = stop_check(store.as_ref(), STOP_HOOK_REQUESTER).unwrap();
        assert!(!outcome.allow);
    }
}
