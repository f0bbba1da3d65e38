//! The import/merge engine.
//!
//! Given a batch of incoming journal records and deletion IDs, produce a
//! deterministic new store state that preserves local-only edits, applies
//! remote changes, honors the configured conflict strategy, and never
//! silently loses data.
//!
//! Imported records are trusted (the source workspace already validated
//! them); only structural invariants are re-checked here.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use beads_config::ConflictResolution;
use beads_core::content_hash::compute_content_hash;
use beads_core::idgen;
use beads_core::issue::{id_prefix_of, Issue, IssueBuilder};
use beads_core::journal::JournalRecord;
use beads_storage::{Storage, StorageError};

use crate::error::{Result, SyncError};
use crate::merge::{three_way_merge, MergeSide};

// ---------------------------------------------------------------------------
// Options and result
// ---------------------------------------------------------------------------

/// How dependency edges with unknown endpoints are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanHandling {
    /// Fail the import.
    Strict,
    /// Create a placeholder bead for the missing endpoint.
    Resurrect,
    /// Drop the edge and record it in `skipped_dependencies`.
    #[default]
    Skip,
    /// Insert the edge anyway.
    Allow,
}

/// Configuration for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Compute and report only; the store is not touched.
    pub dry_run: bool,
    /// Treat existing IDs as untouchable.
    pub skip_update: bool,
    /// Treat missing dependency references as fatal (overrides
    /// `orphan_handling`).
    pub strict: bool,
    /// Auto-rewrite imported IDs whose prefix differs from the workspace
    /// prefix, cascading to all references.
    pub rename_on_import: bool,
    /// Clear `external_ref` on incoming beads whose ref already belongs to a
    /// different local bead.
    pub clear_duplicate_external_refs: bool,
    pub orphan_handling: OrphanHandling,
    /// Accept foreign prefixes verbatim.
    pub skip_prefix_validation: bool,
    /// Deletion IDs beyond those parsed from the incoming records.
    pub deletion_ids: Vec<String>,
    /// Protect IDs present in the left snapshot from deletion.
    pub protect_left_snapshot: bool,
    /// Treat the journal as authoritative: local beads absent from the
    /// incoming batch are removed. Set by the ZFC staleness path, where the
    /// local database has already been judged stale.
    pub prune_missing: bool,
    pub conflict_resolution: ConflictResolution,
    /// The workspace `issue_prefix`; empty disables prefix validation.
    pub expected_prefix: String,
    /// Actor recorded on placeholder beads and audit events.
    pub actor: String,
}

/// A same-ID, different-content collision.
#[derive(Debug, Clone)]
pub struct Collision {
    pub id: String,
    pub local_title: String,
    pub incoming_title: String,
}

/// Counters and details from one import run.
#[derive(Debug, Default)]
pub struct ImportResult {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub collisions: Vec<Collision>,
    /// Foreign prefix -> bead count, populated even on success.
    pub prefix_counts: BTreeMap<String, usize>,
    /// Old ID -> new ID assignments made by rename-on-import.
    pub id_mapping: HashMap<String, String>,
    /// Edges dropped because an endpoint was unknown.
    pub skipped_dependencies: Vec<(String, String)>,
    /// IDs actually removed by deletion application.
    pub removed_ids: Vec<String>,
    /// IDs listed for deletion but left alone (left-snapshot protection).
    pub protected_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

enum Plan {
    Create(Issue),
    Update(Issue),
}

/// Applies a batch of incoming records against the store.
///
/// `left_records` is the pre-pull snapshot: the merge base for three-way
/// merges and the protection set for deletion application. All mutations
/// run in one transaction; on error the store is unchanged.
pub fn import_records(
    store: &dyn Storage,
    records: Vec<JournalRecord>,
    left_records: &[JournalRecord],
    options: &ImportOptions,
) -> Result<ImportResult> {
    let mut result = ImportResult::default();

    // Split incoming lines into bead records and deletion intent.
    let mut incoming: Vec<Issue> = Vec::new();
    let mut deletion_ids: Vec<String> = options.deletion_ids.clone();
    for record in records {
        match record {
            JournalRecord::Bead(issue) => incoming.push(*issue),
            JournalRecord::Deletion(marker) => deletion_ids.push(marker.id),
        }
    }

    // Step 1: prefix validation and optional rename cascade.
    apply_prefix_policy(store, &mut incoming, &mut deletion_ids, options, &mut result)?;

    // Base snapshot lookups.
    let mut base_map: HashMap<&str, &Issue> = HashMap::new();
    let mut left_ids: HashSet<String> = HashSet::new();
    for record in left_records {
        left_ids.insert(record.id().to_owned());
        if let JournalRecord::Bead(issue) = record {
            base_map.insert(issue.id.as_str(), issue.as_ref());
        }
    }

    let incoming_ids: HashSet<String> = incoming.iter().map(|i| i.id.clone()).collect();

    // Steps 2-3: classify each incoming bead (collision detection and
    // three-way merge), producing an execution plan.
    let mut plans: Vec<Plan> = Vec::new();
    for mut issue in incoming {
        let local = match store.get_issue(&issue.id) {
            Ok(local) => Some(local),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };

        if options.clear_duplicate_external_refs {
            clear_duplicate_ref(store, &mut issue)?;
        }

        let Some(local) = local else {
            result.created += 1;
            plans.push(Plan::Create(issue));
            continue;
        };

        if options.skip_update {
            result.skipped += 1;
            continue;
        }

        let base = base_map.get(issue.id.as_str()).copied();
        let local_hash = compute_content_hash(&local);
        let incoming_hash = compute_content_hash(&issue);

        // A bead that exists locally, was NOT known at the last sync point,
        // and differs in content was created independently on both sides:
        // a true hash-ID collision.
        if base.is_none() && local_hash != incoming_hash {
            if options.rename_on_import {
                let new_id = fresh_id(
                    store,
                    &options.expected_prefix,
                    &issue,
                    &incoming_ids,
                    &result.id_mapping,
                )?;
                info!(old = %issue.id, new = %new_id, "collision: assigning fresh ID");
                result.id_mapping.insert(issue.id.clone(), new_id.clone());
                issue.id = new_id;
                result.created += 1;
                plans.push(Plan::Create(issue));
            } else {
                warn!(id = %issue.id, "collision detected; record skipped");
                result.collisions.push(Collision {
                    id: issue.id.clone(),
                    local_title: local.title.clone(),
                    incoming_title: issue.title.clone(),
                });
                result.skipped += 1;
            }
            continue;
        }

        let (merged, side) =
            three_way_merge(base, &local, &issue, options.conflict_resolution);
        if side == MergeSide::Ours && compute_content_hash(&merged) == local_hash {
            result.unchanged += 1;
            continue;
        }
        result.updated += 1;
        plans.push(Plan::Update(merged));
    }

    // Re-apply rename mapping to dependency endpoints assigned after
    // collision renames.
    if !result.id_mapping.is_empty() {
        for plan in &mut plans {
            let issue = match plan {
                Plan::Create(i) | Plan::Update(i) => i,
            };
            for dep in &mut issue.dependencies {
                if let Some(new_id) = result.id_mapping.get(&dep.issue_id) {
                    dep.issue_id = new_id.clone();
                }
                if let Some(new_id) = result.id_mapping.get(&dep.depends_on_id) {
                    dep.depends_on_id = new_id.clone();
                }
            }
        }
    }

    // Step 4: dependency integrity.
    let planned_ids: HashSet<String> = plans
        .iter()
        .map(|p| match p {
            Plan::Create(i) | Plan::Update(i) => i.id.clone(),
        })
        .collect();
    let mut placeholders: Vec<Issue> = Vec::new();
    let orphan_mode = if options.strict {
        OrphanHandling::Strict
    } else {
        options.orphan_handling
    };
    for plan in &mut plans {
        let issue = match plan {
            Plan::Create(i) | Plan::Update(i) => i,
        };
        let mut kept = Vec::with_capacity(issue.dependencies.len());
        for dep in issue.dependencies.drain(..) {
            let known = planned_ids.contains(&dep.depends_on_id)
                || issue_exists(store, &dep.depends_on_id)?;
            if known {
                kept.push(dep);
                continue;
            }
            match orphan_mode {
                OrphanHandling::Strict => {
                    return Err(SyncError::UnknownDependency {
                        issue_id: dep.issue_id,
                        depends_on_id: dep.depends_on_id,
                    });
                }
                OrphanHandling::Allow => kept.push(dep),
                OrphanHandling::Skip => {
                    debug!(from = %dep.issue_id, to = %dep.depends_on_id, "skipping orphan edge");
                    result
                        .skipped_dependencies
                        .push((dep.issue_id.clone(), dep.depends_on_id.clone()));
                }
                OrphanHandling::Resurrect => {
                    if placeholders.iter().all(|p| p.id != dep.depends_on_id) {
                        placeholders.push(placeholder_bead(&dep.depends_on_id, &options.actor));
                        result.created += 1;
                    }
                    kept.push(dep);
                }
            }
        }
        issue.dependencies = kept;
    }
    for placeholder in placeholders {
        plans.insert(0, Plan::Create(placeholder));
    }

    // Reconciliation (ZFC path): the journal is authoritative, so local
    // beads it does not mention are leftovers of a stale database.
    let mut deletions: Vec<String> = Vec::new();
    if options.prune_missing {
        let all = beads_core::filter::IssueFilter {
            include_tombstones: true,
            ..Default::default()
        };
        for local in store.list_issues(&all)? {
            if !incoming_ids.contains(&local.id) {
                debug!(id = %local.id, "pruning bead absent from authoritative journal");
                result.deleted += 1;
                result.removed_ids.push(local.id.clone());
                deletions.push(local.id);
            }
        }
    }

    // Step 5: deletion application with left-snapshot protection.
    let mut deletion_seen: HashSet<String> = deletions.iter().cloned().collect();
    for id in deletion_ids {
        if !deletion_seen.insert(id.clone()) {
            continue;
        }
        if options.protect_left_snapshot && left_ids.contains(&id) {
            result.protected_ids.push(id);
            continue;
        }
        match store.get_issue(&id) {
            Ok(local) if local.is_tombstone() => {
                debug!(id, "preserving tombstone named by deletion marker");
            }
            Ok(_) => {
                // Will be deleted unless the same import just re-created it
                // as live content under protection rules; deletion intent
                // wins over a plain upsert.
                result.deleted += 1;
                result.removed_ids.push(id.clone());
                deletions.push(id);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
    }

    if options.dry_run {
        return Ok(result);
    }

    // Step 6: transactional commit.
    let plans = RefCell::new(plans);
    let skipped_deps = RefCell::new(Vec::new());
    store.run_in_transaction(&|tx| {
        for plan in plans.borrow().iter() {
            let issue = match plan {
                Plan::Create(i) | Plan::Update(i) => i,
            };
            tx.put_issue(issue)?;
        }
        // Edges go in after every endpoint exists.
        for plan in plans.borrow().iter() {
            let issue = match plan {
                Plan::Create(i) | Plan::Update(i) => i,
            };
            // Replace outgoing edges with the merged record's set.
            for existing in tx.get_dependency_records(&issue.id)? {
                tx.remove_dependency(&existing.issue_id, &existing.depends_on_id, &issue.created_by)?;
            }
            for dep in &issue.dependencies {
                match tx.add_dependency(dep, &dep.created_by) {
                    Ok(()) => {}
                    Err(StorageError::CycleDetected) => {
                        // A cross-clone merge can stitch a cycle together;
                        // drop the closing edge rather than fail the batch.
                        warn!(from = %dep.issue_id, to = %dep.depends_on_id,
                              "imported edge would close a cycle; dropped");
                        skipped_deps
                            .borrow_mut()
                            .push((dep.issue_id.clone(), dep.depends_on_id.clone()));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        for id in &deletions {
            tx.remove_all_dependencies(id)?;
            tx.delete_issue(id)?;
        }
        tx.set_metadata("last_import_time", &Utc::now().to_rfc3339())?;
        Ok(())
    })?;
    result
        .skipped_dependencies
        .extend(skipped_deps.into_inner());

    info!(
        created = result.created,
        updated = result.updated,
        deleted = result.deleted,
        unchanged = result.unchanged,
        skipped = result.skipped,
        "import complete"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Buckets incoming beads by prefix; errors, rewrites, or passes through per
/// the options.
fn apply_prefix_policy(
    store: &dyn Storage,
    incoming: &mut [Issue],
    deletion_ids: &mut [String],
    options: &ImportOptions,
    result: &mut ImportResult,
) -> Result<()> {
    if options.expected_prefix.is_empty() {
        return Ok(());
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for issue in incoming.iter() {
        let prefix = id_prefix_of(&issue.id);
        if prefix != options.expected_prefix {
            *counts.entry(prefix.to_owned()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        return Ok(());
    }
    result.prefix_counts = counts.clone();

    if options.skip_prefix_validation && !options.rename_on_import {
        return Ok(());
    }
    if !options.rename_on_import {
        return Err(SyncError::PrefixMismatch(counts));
    }

    // Consistent rewrite: keep the slug, swap the prefix; fall back to a
    // fresh hash ID when the slug is already taken by different content.
    let mut taken: HashSet<String> = incoming.iter().map(|i| i.id.clone()).collect();
    let mut mapping: HashMap<String, String> = HashMap::new();
    for issue in incoming.iter() {
        let prefix = id_prefix_of(&issue.id);
        if prefix == options.expected_prefix {
            continue;
        }
        let slug = issue.id.rsplit('-').next().unwrap_or(&issue.id);
        let candidate = format!("{}-{}", options.expected_prefix, slug);
        let new_id = if !taken.contains(&candidate) && !issue_exists(store, &candidate)? {
            candidate
        } else {
            fresh_id(store, &options.expected_prefix, issue, &taken, &mapping)?
        };
        taken.insert(new_id.clone());
        mapping.insert(issue.id.clone(), new_id);
    }

    // Cascade to every reference.
    for issue in incoming.iter_mut() {
        if let Some(new_id) = mapping.get(&issue.id) {
            issue.id = new_id.clone();
        }
        if let Some(ref mut dp) = issue.decision_point {
            if let Some(new_id) = mapping.get(&dp.issue_id) {
                dp.issue_id = new_id.clone();
            }
        }
        for dep in &mut issue.dependencies {
            if let Some(new_id) = mapping.get(&dep.issue_id) {
                dep.issue_id = new_id.clone();
            }
            if let Some(new_id) = mapping.get(&dep.depends_on_id) {
                dep.depends_on_id = new_id.clone();
            }
        }
    }
    for id in deletion_ids.iter_mut() {
        if let Some(new_id) = mapping.get(id) {
            *id = new_id.clone();
        }
    }

    result.id_mapping.extend(mapping);
    Ok(())
}

/// Generates an unused ID for `issue` under the workspace prefix.
fn fresh_id(
    store: &dyn Storage,
    prefix: &str,
    issue: &Issue,
    taken: &HashSet<String>,
    mapping: &HashMap<String, String>,
) -> Result<String> {
    let length = issue
        .id
        .rsplit('-')
        .next()
        .map(|slug| slug.len().clamp(idgen::adaptive_defaults::MIN_LENGTH, idgen::adaptive_defaults::MAX_LENGTH))
        .unwrap_or(5);
    for nonce in 0..idgen::MAX_NONCE_ATTEMPTS {
        let candidate = idgen::generate_hash_id(
            prefix,
            &issue.title,
            &issue.description,
            &issue.created_by,
            issue.created_at,
            length,
            nonce,
        );
        let used = taken.contains(&candidate)
            || mapping.values().any(|v| v == &candidate)
            || issue_exists(store, &candidate)?;
        if !used {
            return Ok(candidate);
        }
    }
    Err(SyncError::CollisionDetected(vec![issue.id.clone()]))
}

fn issue_exists(store: &dyn Storage, id: &str) -> Result<bool> {
    match store.get_issue(id) {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Looks up the incoming ref locally; strips it when another bead owns it.
fn clear_duplicate_ref(store: &dyn Storage, issue: &mut Issue) -> Result<()> {
    let Some(ref ext) = issue.external_ref else {
        return Ok(());
    };
    match store.get_issue_by_external_ref(ext) {
        Ok(owner) if owner.id != issue.id => {
            debug!(id = %issue.id, owner = %owner.id, "clearing duplicate external_ref");
            issue.external_ref = None;
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn placeholder_bead(id: &str, actor: &str) -> Issue {
    IssueBuilder::new("(resurrected by import: referenced bead was missing)")
        .id(id)
        .created_by(actor)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::dependency::Dependency;
    use beads_core::enums::DependencyType;
    use beads_storage::SqliteStore;
    use chrono::Duration;

    fn record(issue: Issue) -> JournalRecord {
        JournalRecord::Bead(Box::new(issue))
    }

    fn bead(id: &str, title: &str) -> Issue {
        IssueBuilder::new(title).id(id).build()
    }

    fn options(prefix: &str) -> ImportOptions {
        ImportOptions {
            expected_prefix: prefix.into(),
            protect_left_snapshot: true,
            actor: "importer".into(),
            ..Default::default()
        }
    }

    #[test]
    fn creates_missing_beads() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = import_records(
            &store,
            vec![record(bead("bd-a", "A")), record(bead("bd-b", "B"))],
            &[],
            &options("bd"),
        )
        .unwrap();
        assert_eq!(result.created, 2);
        assert_eq!(store.count_issues().unwrap(), 2);
    }

    #[test]
    fn idempotent_import() {
        let store = SqliteStore::open_in_memory().unwrap();
        let records = vec![record(bead("bd-a", "A"))];
        import_records(&store, records.clone(), &[], &options("bd")).unwrap();
        let second = import_records(&store, records, &[], &options("bd")).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 1);
    }

    #[test]
    fn skip_update_leaves_existing() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_issue(&bead("bd-a", "Local title"), "alice").unwrap();

        let mut opts = options("bd");
        opts.skip_update = true;
        let result = import_records(
            &store,
            vec![record(bead("bd-a", "Remote title"))],
            &[],
            &opts,
        )
        .unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(store.get_issue("bd-a").unwrap().title, "Local title");
    }

    #[test]
    fn prefix_mismatch_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = import_records(
            &store,
            vec![record(bead("other-a", "Foreign"))],
            &[],
            &options("bd"),
        )
        .unwrap_err();
        match err {
            SyncError::PrefixMismatch(counts) => {
                assert_eq!(counts.get("other"), Some(&1));
            }
            other => panic!("expected PrefixMismatch, got {other:?}"),
        }
    }

    #[test]
    fn rename_on_import_rewrites_references() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut child = bead("other-b", "Child");
        child.dependencies = vec![Dependency::new(
            "other-b",
            "other-a",
            DependencyType::Blocks,
            "alice",
        )];

        let mut opts = options("bd");
        opts.rename_on_import = true;
        let result = import_records(
            &store,
            vec![record(bead("other-a", "Parent")), record(child)],
            &[],
            &opts,
        )
        .unwrap();

        assert_eq!(result.created, 2);
        assert_eq!(result.id_mapping.get("other-a").unwrap(), "bd-a");
        assert_eq!(result.id_mapping.get("other-b").unwrap(), "bd-b");

        let deps = store.get_issue("bd-b").unwrap().dependencies;
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].depends_on_id, "bd-a");
    }

    #[test]
    fn skip_prefix_validation_accepts_foreign() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut opts = options("bd");
        opts.skip_prefix_validation = true;
        let result =
            import_records(&store, vec![record(bead("other-a", "F"))], &[], &opts).unwrap();
        assert_eq!(result.created, 1);
        assert!(store.get_issue("other-a").is_ok());
    }

    #[test]
    fn collision_without_rename_is_recorded() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_issue(&bead("bd-x", "Local creation"), "alice").unwrap();

        // Incoming shares the ID, differs in content, and the ID is absent
        // from the left snapshot: independent creation on both sides.
        let result = import_records(
            &store,
            vec![record(bead("bd-x", "Remote creation"))],
            &[],
            &options("bd"),
        )
        .unwrap();
        assert_eq!(result.collisions.len(), 1);
        assert_eq!(result.collisions[0].id, "bd-x");
        assert_eq!(result.skipped, 1);
        assert_eq!(store.get_issue("bd-x").unwrap().title, "Local creation");
    }

    #[test]
    fn collision_with_rename_creates_fresh_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_issue(&bead("bd-x", "Local creation"), "alice").unwrap();

        let mut opts = options("bd");
        opts.rename_on_import = true;
        let result = import_records(
            &store,
            vec![record(bead("bd-x", "Remote creation"))],
            &[],
            &opts,
        )
        .unwrap();
        assert_eq!(result.created, 1);
        let new_id = result.id_mapping.get("bd-x").unwrap();
        assert_ne!(new_id, "bd-x");
        assert_eq!(store.get_issue(new_id).unwrap().title, "Remote creation");
        assert_eq!(store.get_issue("bd-x").unwrap().title, "Local creation");
    }

    #[test]
    fn remote_edit_applied_via_snapshot_base() {
        let store = SqliteStore::open_in_memory().unwrap();
        let base = bead("bd-e", "Shared");
        store.create_issue(&base, "alice").unwrap();
        let local = store.get_issue("bd-e").unwrap();

        let mut remote = local.clone();
        remote.priority = 0;
        remote.updated_at = local.updated_at + Duration::seconds(30);

        let left = vec![record(local)];
        let result =
            import_records(&store, vec![record(remote)], &left, &options("bd")).unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(store.get_issue("bd-e").unwrap().priority, 0);
    }

    #[test]
    fn local_edit_survives_stale_remote() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_issue(&bead("bd-f", "Original"), "alice").unwrap();
        let snapshot = store.get_issue("bd-f").unwrap();

        // Local edit after the snapshot.
        let updates = beads_storage::IssueUpdates {
            title: Some("Edited locally".into()),
            ..Default::default()
        };
        store.update_issue("bd-f", &updates, "alice").unwrap();

        // Remote still has the snapshot content.
        let left = vec![record(snapshot.clone())];
        let result = import_records(
            &store,
            vec![record(snapshot)],
            &left,
            &options("bd"),
        )
        .unwrap();
        assert_eq!(result.unchanged, 1);
        assert_eq!(store.get_issue("bd-f").unwrap().title, "Edited locally");
    }

    #[test]
    fn deletion_marker_removes_bead() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_issue(&bead("bd-g", "Doomed"), "alice").unwrap();

        let mut opts = options("bd");
        opts.deletion_ids = vec!["bd-g".into()];
        let result = import_records(&store, vec![], &[], &opts).unwrap();
        assert_eq!(result.deleted, 1);
        assert_eq!(result.removed_ids, vec!["bd-g".to_string()]);
        assert!(store.get_issue("bd-g").unwrap_err().is_not_found());
    }

    #[test]
    fn left_snapshot_protects_from_deletion() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_issue(&bead("bd-h", "Protected"), "alice").unwrap();
        let left = vec![record(store.get_issue("bd-h").unwrap())];

        let mut opts = options("bd");
        opts.deletion_ids = vec!["bd-h".into()];
        let result = import_records(&store, vec![], &left, &opts).unwrap();
        assert_eq!(result.deleted, 0);
        assert_eq!(result.protected_ids, vec!["bd-h".to_string()]);
        assert!(store.get_issue("bd-h").is_ok());
    }

    #[test]
    fn tombstone_survives_deletion_marker() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ts = bead("bd-i", "Gone").into_tombstone("alice", Utc::now());
        store.run_in_transaction(&|tx| tx.put_issue(&ts)).unwrap();

        let mut opts = options("bd");
        opts.deletion_ids = vec!["bd-i".into()];
        let result = import_records(&store, vec![], &[], &opts).unwrap();
        assert_eq!(result.deleted, 0);
        assert!(store.get_issue("bd-i").unwrap().is_tombstone());
    }

    #[test]
    fn strict_mode_fails_on_unknown_dependency() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut issue = bead("bd-j", "Has orphan edge");
        issue.dependencies = vec![Dependency::new(
            "bd-j",
            "bd-missing",
            DependencyType::Blocks,
            "alice",
        )];

        let mut opts = options("bd");
        opts.strict = true;
        let err = import_records(&store, vec![record(issue)], &[], &opts).unwrap_err();
        assert!(matches!(err, SyncError::UnknownDependency { .. }));
        // Transaction untouched: the bead was not created either.
        assert_eq!(store.count_issues().unwrap(), 0);
    }

    #[test]
    fn skip_mode_records_orphan_edges() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut issue = bead("bd-k", "Has orphan edge");
        issue.dependencies = vec![Dependency::new(
            "bd-k",
            "bd-missing",
            DependencyType::Blocks,
            "alice",
        )];

        let result =
            import_records(&store, vec![record(issue)], &[], &options("bd")).unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(
            result.skipped_dependencies,
            vec![("bd-k".to_string(), "bd-missing".to_string())]
        );
        assert!(store.get_issue("bd-k").unwrap().dependencies.is_empty());
    }

    #[test]
    fn resurrect_mode_creates_placeholder() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut issue = bead("bd-l", "Needs parent");
        issue.dependencies = vec![Dependency::new(
            "bd-l",
            "bd-ghost",
            DependencyType::ParentChild,
            "alice",
        )];

        let mut opts = options("bd");
        opts.orphan_handling = OrphanHandling::Resurrect;
        let result = import_records(&store, vec![record(issue)], &[], &opts).unwrap();
        assert_eq!(result.created, 2);
        assert!(store.get_issue("bd-ghost").is_ok());
        assert_eq!(store.get_issue("bd-l").unwrap().dependencies.len(), 1);
    }

    #[test]
    fn prune_missing_reconciles_to_journal() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_issue(&bead("bd-keep", "Kept"), "alice").unwrap();
        store.create_issue(&bead("bd-extra", "Stale leftover"), "alice").unwrap();

        let mut opts = options("bd");
        opts.prune_missing = true;
        let result = import_records(
            &store,
            vec![record(bead("bd-keep", "Kept"))],
            &[],
            &opts,
        )
        .unwrap();
        assert_eq!(result.deleted, 1);
        assert_eq!(result.removed_ids, vec!["bd-extra".to_string()]);
        assert_eq!(store.count_issues().unwrap(), 1);
        assert!(store.get_issue("bd-keep").is_ok());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut opts = options("bd");
        opts.dry_run = true;
        opts.deletion_ids = vec!["bd-n".into()];

        let result =
            import_records(&store, vec![record(bead("bd-m", "New"))], &[], &opts).unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(store.count_issues().unwrap(), 0);
    }

    #[test]
    fn duplicate_external_ref_cleared() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut owner = bead("bd-o", "Owner");
        owner.external_ref = Some("https://x/1".into());
        store.create_issue(&owner, "alice").unwrap();

        let mut dup = bead("bd-p", "Dup ref");
        dup.external_ref = Some("https://x/1".into());

        let mut opts = options("bd");
        opts.clear_duplicate_external_refs = true;
        import_records(&store, vec![record(dup)], &[], &opts).unwrap();
        assert!(store.get_issue("bd-p").unwrap().external_ref.is_none());
    }

    #[test]
    fn decision_point_round_trips_verbatim() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut dp = beads_core::decision::DecisionPoint::new("bd-q", "Merge?");
        dp.requested_by = "agent-1".into();
        dp.responded_at = Some(Utc::now());
        dp.selected_option = "option-a".into();
        dp.response_text = "yes".into();

        let gate = IssueBuilder::new("Gate")
            .id("bd-q")
            .await_type("decision")
            .decision_point(dp)
            .build();

        import_records(&store, vec![record(gate)], &[], &options("bd")).unwrap();

        let back = store.get_decision_point("bd-q").unwrap();
        assert!(back.is_responded());
        assert_eq!(back.selected_option, "option-a");
        assert_eq!(back.response_text, "yes");
    }
}
