//! Operation router: dispatches request envelopes against the store.
//!
//! Writes go through the storage engine (whose internal lock is the
//! single-writer invariant); bus events are published after the committing
//! call returns, so subscribers can rely on reading the post-condition.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use beads_core::decision::{DecisionOption, DecisionPoint};
use beads_core::enums::{IssueType, Status, GATE_TYPE};
use beads_core::filter::IssueFilter;
use beads_core::idgen;
use beads_core::issue::{Issue, IssueBuilder};
use beads_storage::{DecisionResponseInput, IssueUpdates, Storage};

use crate::bus::{subjects, BusEvent, EventBus};
use crate::flush::FlushScheduler;
use crate::wait::{stop_check, wait_for_decision, WaitOptions};

/// Routes RPC operations. Cheap to clone per connection.
#[derive(Clone)]
pub struct Handler {
    store: Arc<dyn Storage>,
    bus: EventBus,
    flush: Option<FlushScheduler>,
}

impl Handler {
    pub fn new(store: Arc<dyn Storage>, bus: EventBus, flush: Option<FlushScheduler>) -> Self {
        Self { store, bus, flush }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Dispatches one operation. Errors come back as strings ready for the
    /// failure envelope.
    pub async fn dispatch(&self, operation: &str, args: &Value) -> Result<Value, String> {
        debug!(operation, "dispatching request");
        match operation {
            "health" => Ok(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            })),
            "list" => self.op_list(args),
            "show" => self.op_show(args),
            "create" => self.op_create(args),
            "update" => self.op_update(args),
            "close" => self.op_close(args),
            "resolveID" => self.op_resolve_id(args),
            "addLabel" => self.op_add_label(args),
            "configSet" => self.op_config_set(args),
            "configGet" => self.op_config_get(args),
            "decisionCreate" => self.op_decision_create(args),
            "decisionRespond" => self.op_decision_respond(args),
            "decisionList" => self.op_decision_list(),
            "decisionGet" => self.op_decision_get(args),
            "decisionRemind" => self.op_decision_remind(args),
            "decisionWait" => self.op_decision_wait(args).await,
            "stopCheck" => self.op_stop_check(args),
            "formulaSave" => self.op_formula_save(args),
            "types" => self.op_types(),
            "busStatus" => Ok(json!({
                "subscribers": self.bus.subscriber_count(),
                "published": self.bus.published_count(),
            })),
            other => Err(format!(
                "unknown operation '{other}'; run 'health' for connectivity or upgrade bd"
            )),
        }
    }

    fn mark_dirty(&self) {
        if let Some(ref flush) = self.flush {
            flush.mark_dirty();
        }
    }

    fn actor(args: &Value) -> String {
        args.get("actor")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("daemon-client")
            .to_owned()
    }

    fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
        args.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing required argument '{key}'"))
    }

    fn issue_to_json(issue: &Issue) -> Value {
        serde_json::to_value(issue).unwrap_or(Value::Null)
    }

    // -- Issue operations ----------------------------------------------------

    fn op_list(&self, args: &Value) -> Result<Value, String> {
        let mut filter = IssueFilter::all();
        if let Some(status) = args.get("status").and_then(Value::as_str) {
            filter.status = Some(Status::from(status));
        }
        if let Some(t) = args.get("type").and_then(Value::as_str) {
            filter.issue_type = Some(IssueType::from(t));
        }
        if let Some(assignee) = args.get("assignee").and_then(Value::as_str) {
            filter.assignee = Some(assignee.to_owned());
        }
        if let Some(limit) = args.get("limit").and_then(Value::as_u64) {
            filter.limit = Some(limit as usize);
        }
        let issues = self.store.list_issues(&filter).map_err(|e| e.to_string())?;
        Ok(Value::Array(issues.iter().map(Self::issue_to_json).collect()))
    }

    fn op_show(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?;
        let issue = self.store.get_issue(id).map_err(|e| e.to_string())?;
        Ok(Self::issue_to_json(&issue))
    }

    fn op_create(&self, args: &Value) -> Result<Value, String> {
        let title = Self::required_str(args, "title")?;
        let actor = Self::actor(args);

        let mut builder = IssueBuilder::new(title).created_by(&actor);
        if let Some(desc) = args.get("description").and_then(Value::as_str) {
            builder = builder.description(desc);
        }
        if let Some(t) = args.get("type").and_then(Value::as_str) {
            builder = builder.issue_type(IssueType::from(t));
        }
        if let Some(p) = args.get("priority").and_then(Value::as_i64) {
            builder = builder.priority(p as i32);
        }
        if let Some(assignee) = args.get("assignee").and_then(Value::as_str) {
            builder = builder.assignee(assignee);
        }
        if let Some(labels) = args.get("labels").and_then(Value::as_array) {
            let labels: Vec<String> = labels
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
            builder = builder.labels(labels);
        }
        let mut issue = builder.build();

        let id = self.create_with_generated_id(&mut issue, &actor)?;
        self.bus
            .publish(BusEvent::new(subjects::ISSUE_CREATED, &id, &actor));
        self.mark_dirty();
        Ok(json!({"id": id}))
    }

    /// Generates a hash ID and inserts, retrying with a fresh nonce on
    /// primary-key conflicts.
    fn create_with_generated_id(&self, issue: &mut Issue, actor: &str) -> Result<String, String> {
        let prefix = self
            .store
            .get_config("issue_prefix")
            .unwrap_or_else(|_| "bd".to_owned());
        let count = self.store.count_issues().map_err(|e| e.to_string())? as usize;
        let length = idgen::compute_adaptive_length(
            count,
            idgen::adaptive_defaults::MIN_LENGTH,
            idgen::adaptive_defaults::MAX_LENGTH,
            idgen::adaptive_defaults::MAX_COLLISION_PROB,
        );

        let mut last_err = String::new();
        for nonce in 0..idgen::MAX_NONCE_ATTEMPTS {
            issue.id = idgen::generate_hash_id(
                &prefix,
                &issue.title,
                &issue.description,
                actor,
                issue.created_at,
                length,
                nonce,
            );
            match self.store.create_issue(issue, actor) {
                Ok(()) => return Ok(issue.id.clone()),
                Err(e) if e.is_conflict() => {
                    last_err = e.to_string();
                    continue;
                }
                Err(e) => return Err(e.to_string()),
            }
        }
        Err(format!("id generation exhausted after retries: {last_err}"))
    }

    fn op_update(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?;
        let actor = Self::actor(args);

        let mut updates = IssueUpdates::default();
        if let Some(v) = args.get("title").and_then(Value::as_str) {
            updates.title = Some(v.to_owned());
        }
        if let Some(v) = args.get("description").and_then(Value::as_str) {
            updates.description = Some(v.to_owned());
        }
        if let Some(v) = args.get("status").and_then(Value::as_str) {
            updates.status = Some(Status::from(v));
        }
        if let Some(v) = args.get("priority").and_then(Value::as_i64) {
            updates.priority = Some(v as i32);
        }
        if let Some(v) = args.get("type").and_then(Value::as_str) {
            updates.issue_type = Some(IssueType::from(v));
        }
        if let Some(v) = args.get("assignee").and_then(Value::as_str) {
            updates.assignee = Some(v.to_owned());
        }

        self.store
            .update_issue(id, &updates, &actor)
            .map_err(|e| e.to_string())?;
        self.bus
            .publish(BusEvent::new(subjects::ISSUE_UPDATED, id, &actor));
        self.mark_dirty();
        Ok(json!({"id": id}))
    }

    fn op_close(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?;
        let reason = args.get("reason").and_then(Value::as_str).unwrap_or("");
        let actor = Self::actor(args);

        self.store
            .close_issue(id, reason, &actor)
            .map_err(|e| e.to_string())?;
        self.bus
            .publish(BusEvent::new(subjects::ISSUE_CLOSED, id, &actor));
        self.mark_dirty();
        Ok(json!({"id": id}))
    }

    fn op_resolve_id(&self, args: &Value) -> Result<Value, String> {
        let fragment = Self::required_str(args, "id")?;

        if self.store.get_issue(fragment).is_ok() {
            return Ok(json!({"id": fragment}));
        }

        let all = self
            .store
            .list_issues(&IssueFilter::all())
            .map_err(|e| e.to_string())?;
        let matches: Vec<&str> = all
            .iter()
            .map(|i| i.id.as_str())
            .filter(|id| id.starts_with(fragment) || id.ends_with(fragment))
            .collect();
        match matches.as_slice() {
            [] => Err(format!("no issue matches '{fragment}'")),
            [only] => Ok(json!({"id": only})),
            many => Err(format!(
                "'{fragment}' is ambiguous: matches {}",
                many.join(", ")
            )),
        }
    }

    fn op_add_label(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?;
        let label = Self::required_str(args, "label")?;
        let actor = Self::actor(args);

        self.store
            .add_label(id, label, &actor)
            .map_err(|e| e.to_string())?;
        self.bus
            .publish(BusEvent::new(subjects::ISSUE_UPDATED, id, &actor));
        self.mark_dirty();
        Ok(json!({"id": id, "label": label}))
    }

    // -- Config --------------------------------------------------------------

    fn op_config_set(&self, args: &Value) -> Result<Value, String> {
        let key = Self::required_str(args, "key")?;
        let value = Self::required_str(args, "value")?;
        self.store.set_config(key, value).map_err(|e| e.to_string())?;
        self.mark_dirty();
        Ok(json!({"key": key}))
    }

    fn op_config_get(&self, args: &Value) -> Result<Value, String> {
        let key = Self::required_str(args, "key")?;
        let value = self.store.get_config(key).map_err(|e| e.to_string())?;
        Ok(json!({"key": key, "value": value}))
    }

    // -- Decisions -----------------------------------------------------------

    fn op_decision_create(&self, args: &Value) -> Result<Value, String> {
        let prompt = Self::required_str(args, "prompt")?;
        let actor = Self::actor(args);
        let title = args
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(prompt)
            .to_owned();

        let mut gate = IssueBuilder::new(&title)
            .issue_type(IssueType::Custom(GATE_TYPE.into()))
            .await_type("decision")
            .created_by(&actor)
            .build();
        if let Some(secs) = args.get("timeout_secs").and_then(Value::as_u64) {
            gate.timeout = Some(Duration::from_secs(secs));
        }

        let id = self.create_with_generated_id(&mut gate, &actor)?;

        let mut dp = DecisionPoint::new(&id, prompt);
        dp.requested_by = actor.clone();
        if let Some(options) = args.get("options") {
            dp.options = serde_json::from_value::<Vec<DecisionOption>>(options.clone())
                .map_err(|e| format!("invalid options: {e}"))?;
        }
        if let Some(v) = args.get("default_option").and_then(Value::as_str) {
            dp.default_option = v.to_owned();
        }
        if let Some(v) = args.get("max_iterations").and_then(Value::as_i64) {
            dp.max_iterations = v as i32;
        }
        if let Some(v) = args.get("urgency").and_then(Value::as_str) {
            dp.urgency = v.to_owned();
        }
        if let Some(secs) = args.get("timeout_secs").and_then(Value::as_i64) {
            dp.timeout_secs = secs;
        }

        self.store
            .create_decision_point(&dp, &actor)
            .map_err(|e| e.to_string())?;
        self.bus
            .publish(BusEvent::new(subjects::DECISION_CREATED, &id, &actor));
        self.mark_dirty();
        Ok(json!({"id": id}))
    }

    fn op_decision_respond(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?;
        let selected = Self::required_str(args, "selected")?;
        let actor = Self::actor(args);

        let response = DecisionResponseInput {
            selected_option: selected.to_owned(),
            response_text: args
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_owned(),
            rationale: args
                .get("rationale")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_owned(),
            guidance: args
                .get("guidance")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_owned(),
        };
        let dp = self
            .store
            .respond_decision(id, &response, &actor)
            .map_err(|e| e.to_string())?;

        // Emitted after the committing transaction: subscribers reading the
        // store on this event observe the response.
        self.bus
            .publish(BusEvent::new(subjects::DECISION_RESPONDED, id, &actor));
        self.bus
            .publish(BusEvent::new(subjects::ISSUE_CLOSED, id, &actor));
        self.mark_dirty();
        serde_json::to_value(&dp).map_err(|e| e.to_string())
    }

    fn op_decision_list(&self) -> Result<Value, String> {
        let pending = self
            .store
            .list_pending_decisions()
            .map_err(|e| e.to_string())?;
        serde_json::to_value(&pending).map_err(|e| e.to_string())
    }

    fn op_decision_get(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?;
        let dp = self.store.get_decision_point(id).map_err(|e| e.to_string())?;
        serde_json::to_value(&dp).map_err(|e| e.to_string())
    }

    fn op_decision_remind(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?;
        let mut dp = self.store.get_decision_point(id).map_err(|e| e.to_string())?;
        if dp.is_responded() {
            return Err(format!("decision {id} already responded"));
        }
        dp.reminder_count += 1;
        self.store
            .update_decision_point(&dp)
            .map_err(|e| e.to_string())?;
        self.mark_dirty();
        Ok(json!({"id": id, "reminder_count": dp.reminder_count}))
    }

    async fn op_decision_wait(&self, args: &Value) -> Result<Value, String> {
        let id = Self::required_str(args, "id")?.to_owned();
        let mut options = WaitOptions::default();
        if let Some(secs) = args.get("timeout_secs").and_then(Value::as_u64) {
            options.timeout = Duration::from_secs(secs);
        }
        let response = wait_for_decision(self.store.as_ref(), Some(&self.bus), &id, &options)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(&response).map_err(|e| e.to_string())
    }

    fn op_stop_check(&self, args: &Value) -> Result<Value, String> {
        let actor = Self::required_str(args, "actor")?;
        let outcome = stop_check(self.store.as_ref(), actor).map_err(|e| e.to_string())?;
        Ok(json!({
            "allow": outcome.allow,
            "reason": outcome.reason,
            "decision_id": outcome.decision_id,
        }))
    }

    // -- Formulas and types --------------------------------------------------

    fn op_formula_save(&self, args: &Value) -> Result<Value, String> {
        let body = args
            .get("formula")
            .ok_or_else(|| "missing required argument 'formula'".to_owned())?;
        let actor = Self::actor(args);
        let formula = beads_formula::parse_json(&body.to_string()).map_err(|e| e.to_string())?;
        let prefix = self
            .store
            .get_config("issue_prefix")
            .unwrap_or_else(|_| "bd".to_owned());
        let id = beads_formula::save_formula(self.store.as_ref(), &formula, &prefix, &actor)
            .map_err(|e| e.to_string())?;
        self.mark_dirty();
        Ok(json!({"id": id, "formula": formula.formula}))
    }

    fn op_types(&self) -> Result<Value, String> {
        let custom: Vec<String> = self
            .store
            .get_config("types.custom")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(json!({
            "builtin": ["task", "bug", "feature", "chore", "epic"],
            "custom": custom,
        }))
    }
}
