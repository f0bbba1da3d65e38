//! External-tracker adapter contract.
//!
//! The orchestrator drives any foreign tracker through these traits; it
//! never learns tracker-specific wire formats. Implementations register a
//! constructor by name and slot in without further changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use beads_config::ConflictResolution;
use beads_core::enums::{IssueType, Status};
use beads_core::issue::Issue;
use beads_storage::{IssueUpdates, Storage};

use crate::error::{Result, SyncError};
use crate::merge::{three_way_merge, MergeSide};

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Converts priority, status, type, and whole records between local and
/// remote vocabularies.
pub trait FieldMapper {
    fn priority_to_remote(&self, priority: i32) -> String;
    fn priority_from_remote(&self, raw: &str) -> i32;
    fn status_to_remote(&self, status: &Status) -> String;
    fn status_from_remote(&self, raw: &str) -> Status;
    fn type_to_remote(&self, issue_type: &IssueType) -> String;
    fn type_from_remote(&self, raw: &str) -> IssueType;
}

/// A foreign issue tracker.
///
/// `fetch_issues` returns records already translated into beads (via the
/// implementation's [`FieldMapper`]), with `external_ref` set to the
/// canonical remote reference.
pub trait Tracker {
    /// Registry key, e.g. `gitlab`.
    fn name(&self) -> &str;
    /// Human-readable name, e.g. `GitLab`.
    fn display_name(&self) -> &str;
    /// Config key prefix, e.g. `gitlab` for `gitlab.last_sync`.
    fn config_prefix(&self) -> &str;

    /// Prepares the adapter from tracker-specific config keys.
    fn init(&mut self, config: &HashMap<String, String>) -> Result<()>;
    /// Checks connectivity and credentials.
    fn validate(&self) -> Result<()>;
    /// Releases adapter resources.
    fn close(&mut self) -> Result<()>;

    /// Fetches remote issues changed since `since` (all when `None`),
    /// optionally filtered by remote state.
    fn fetch_issues(
        &self,
        since: Option<DateTime<Utc>>,
        state_filter: Option<&str>,
    ) -> Result<Vec<Issue>>;
    /// Fetches one remote issue by identifier.
    fn fetch_issue(&self, identifier: &str) -> Result<Issue>;

    /// Creates a remote issue; returns its canonical external ref.
    fn create_issue(&self, issue: &Issue) -> Result<String>;
    /// Updates the remote issue behind `external_ref`.
    fn update_issue(&self, external_ref: &str, issue: &Issue) -> Result<()>;

    /// The vocabulary mapper for this tracker.
    fn mapper(&self) -> &dyn FieldMapper;

    // -- Reference helpers ---------------------------------------------------

    /// Whether a ref string belongs to this tracker.
    fn is_external_ref(&self, reference: &str) -> bool;
    /// Extracts the tracker-native identifier from a ref.
    fn extract_identifier(&self, reference: &str) -> Option<String>;
    /// Builds the canonical ref for a tracker-native identifier.
    fn build_external_ref(&self, identifier: &str) -> String;
    /// Normalizes ref spellings (trailing slashes, http vs https, ...).
    fn canonicalize_ref(&self, reference: &str) -> String;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type TrackerCtor = Box<dyn Fn() -> Box<dyn Tracker> + Send + Sync>;

/// Name-keyed registry of tracker constructors.
#[derive(Default)]
pub struct TrackerRegistry {
    constructors: HashMap<String, TrackerCtor>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under its tracker name.
    pub fn register(&mut self, name: impl Into<String>, ctor: TrackerCtor) {
        self.constructors.insert(name.into(), ctor);
    }

    /// Instantiates a tracker by name.
    pub fn create(&self, name: &str) -> Result<Box<dyn Tracker>> {
        self.constructors
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| SyncError::Tracker(format!("unknown tracker '{name}'")))
    }

    /// Registered tracker names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Sync engine
// ---------------------------------------------------------------------------

/// Options for one external-tracker sync run.
#[derive(Debug, Clone, Default)]
pub struct TrackerSyncOptions {
    /// Pull remote changes into the store.
    pub pull: bool,
    /// Push local beads to the tracker.
    pub push: bool,
    pub dry_run: bool,
    /// Push only beads without an external ref (never update remote).
    pub create_only: bool,
    /// Write freshly created external refs back onto local beads.
    pub update_refs: bool,
    /// Remote state filter passed to `fetch_issues`.
    pub state_filter: Option<String>,
    pub conflict_resolution: ConflictResolution,
}

/// Counters from one external-tracker sync run.
#[derive(Debug, Default)]
pub struct TrackerSyncResult {
    pub pulled_created: usize,
    pub pulled_updated: usize,
    pub pushed_created: usize,
    pub pushed_updated: usize,
    pub unchanged: usize,
}

/// Runs a pull and/or push cycle against a tracker.
///
/// Incremental sync: the `<tracker>.last_sync` config key bounds the fetch;
/// its absence forces a full sync. The key is advanced on success.
pub fn sync_with_tracker(
    store: &dyn Storage,
    tracker: &dyn Tracker,
    options: &TrackerSyncOptions,
) -> Result<TrackerSyncResult> {
    tracker.validate()?;
    let mut result = TrackerSyncResult::default();
    let last_sync_key = format!("{}.last_sync", tracker.config_prefix());

    if options.pull {
        let since = store
            .get_config(&last_sync_key)
            .ok()
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok());
        if since.is_none() {
            debug!(tracker = tracker.name(), "no last_sync; full fetch");
        }
        let remote_issues =
            tracker.fetch_issues(since, options.state_filter.as_deref())?;

        for remote in remote_issues {
            let Some(ref ext) = remote.external_ref else {
                continue;
            };
            let ext = tracker.canonicalize_ref(ext);
            match store.get_issue_by_external_ref(&ext) {
                Ok(local) => {
                    let (merged, side) = three_way_merge(
                        None,
                        &local,
                        &remote,
                        options.conflict_resolution,
                    );
                    if side == MergeSide::Ours {
                        result.unchanged += 1;
                        continue;
                    }
                    result.pulled_updated += 1;
                    if !options.dry_run {
                        let updates = IssueUpdates {
                            title: Some(merged.title.clone()),
                            description: Some(merged.description.clone()),
                            status: Some(merged.status.clone()),
                            priority: Some(merged.priority),
                            issue_type: Some(merged.issue_type.clone()),
                            assignee: Some(merged.assignee.clone()),
                            ..Default::default()
                        };
                        store.update_issue(&local.id, &updates, "tracker-sync")?;
                    }
                }
                Err(e) if e.is_not_found() => {
                    result.pulled_created += 1;
                    if !options.dry_run {
                        let mut issue = remote;
                        issue.external_ref = Some(ext);
                        store.create_issue(&issue, "tracker-sync")?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    if options.push {
        let locals = store.list_issues(&beads_core::filter::IssueFilter::all())?;
        for local in locals {
            match local.external_ref {
                None => {
                    result.pushed_created += 1;
                    if options.dry_run {
                        continue;
                    }
                    let ext = tracker.create_issue(&local)?;
                    if options.update_refs {
                        let updates = IssueUpdates {
                            external_ref: Some(Some(tracker.canonicalize_ref(&ext))),
                            ..Default::default()
                        };
                        store.update_issue(&local.id, &updates, "tracker-sync")?;
                    }
                }
                Some(ref ext) if !options.create_only && tracker.is_external_ref(ext) => {
                    result.pushed_updated += 1;
                    if !options.dry_run {
                        tracker.update_issue(ext, &local)?;
                    }
                }
                Some(_) => {}
            }
        }
    }

    if !options.dry_run {
        store.set_config(&last_sync_key, &Utc::now().to_rfc3339())?;
    }
    info!(
        tracker = tracker.name(),
        pulled_created = result.pulled_created,
        pulled_updated = result.pulled_updated,
        pushed_created = result.pushed_created,
        pushed_updated = result.pushed_updated,
        "tracker sync complete"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests (mock adapter)
// ---------------------------------------------------------------------------
