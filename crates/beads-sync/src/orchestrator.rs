//! The sync orchestrator: export -> commit -> pull -> import cycles.
//!
//! One cycle, git-portable mode:
//! 1. Take the workspace sync lock (stale cutoff one hour).
//! 2. Write the left snapshot from current DB content.
//! 3. Import when the journal's content hash moved or the ZFC staleness
//!    guard fires; ZFC also skips the subsequent export.
//! 4. Export the DB to the canonical journal and record the new hash.
//! 5. Commit the journal and deletion manifest to the sync branch.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use beads_config::{BeadsConfig, SyncMode, WorkspacePaths};
use beads_core::journal::{
    content_hash_hex, count_bead_lines, JournalError, JournalRecord,
};
use beads_lockfile::LockFile;
use beads_storage::Storage;

use crate::error::{Result, SyncError};
use crate::export::export_to_path;
use crate::import::{import_records, ImportOptions, ImportResult};
use crate::journal_files::{
    auto_compact_deletions, deletion_manifest_ids, read_journal_file, write_left_snapshot,
};
use crate::merge::three_way_merge;

/// What one sync cycle did.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub imported: Option<ImportResult>,
    pub exported: bool,
    pub committed: bool,
    /// Set when the export leg was skipped (ZFC guard or sync mode).
    pub export_skipped_reason: Option<String>,
}

/// The Zero-Failure-Commit staleness guard.
///
/// Fires when the local DB holds more than 1.5x the journal's bead count
/// (and the journal is non-empty): a force-reset or post-cleanup database
/// must import before it is allowed to overwrite the shared journal.
pub fn zfc_triggered(db_count: i64, jsonl_count: usize) -> bool {
    jsonl_count > 0 && db_count * 2 > (jsonl_count as i64) * 3
}

/// Runs one full sync cycle.
///
/// `repo_root` points at the enclosing git work tree; `None` (or a non-repo
/// path) skips the commit leg.
pub fn sync_cycle(
    store: &dyn Storage,
    paths: &WorkspacePaths,
    config: &BeadsConfig,
    repo_root: Option<&Path>,
    actor: &str,
) -> Result<SyncOutcome> {
    let _lock = LockFile::acquire(paths.sync_lock_path())?;
    let mut outcome = SyncOutcome::default();

    if config.sync.mode == SyncMode::NativeRemote {
        // Native replication owns this workspace; the journal is not ours
        // to write.
        outcome.export_skipped_reason = Some("sync.mode is native-remote".into());
        return Ok(outcome);
    }

    // Step 2: authoritative record of "ours", taken before any pull.
    let left_records = write_left_snapshot(store, &paths.left_snapshot_path())?;

    // Step 3: staleness signals.
    let journal_path = paths.existing_jsonl_path();
    let journal_bytes = if journal_path.exists() {
        std::fs::read(&journal_path)?
    } else {
        Vec::new()
    };
    let jsonl_count = count_bead_lines(&journal_bytes);
    let db_count = store.count_issues()?;
    let stored_hash = store.get_metadata("jsonl_content_hash").unwrap_or_default();
    let file_hash = content_hash_hex(&journal_bytes);
    let hash_changed = !journal_bytes.is_empty() && file_hash != stored_hash;
    let zfc = zfc_triggered(db_count, jsonl_count);

    if hash_changed || zfc {
        if zfc {
            warn!(
                db_count,
                jsonl_count, "staleness guard fired: importing journal, skipping export"
            );
        }
        let records = read_journal_or_resolve(&journal_path, repo_root)?;
        let deletion_ids = deletion_manifest_ids(&paths.deletions_path())?;

        // Sanitize the incoming journal first: stale deletion intent is
        // dropped here under the same protection rules the store-side
        // deletion step applies, so both views converge.
        let deletion_set: HashSet<String> = deletion_ids.iter().cloned().collect();
        let left_ids: HashSet<String> =
            left_records.iter().map(|r| r.id().to_owned()).collect();
        let sanitized = crate::sanitize::sanitize_records(records, &deletion_set, &left_ids);
        if !sanitized.removed_ids.is_empty() {
            debug!(removed = sanitized.removed_ids.len(), "sanitized incoming journal");
        }

        let options = ImportOptions {
            deletion_ids,
            protect_left_snapshot: !zfc,
            prune_missing: zfc,
            conflict_resolution: config.sync.conflict_resolution,
            expected_prefix: store.get_config("issue_prefix").unwrap_or_default(),
            actor: actor.to_owned(),
            ..Default::default()
        };
        outcome.imported = Some(import_records(
            store,
            sanitized.records,
            &left_records,
            &options,
        )?);
    }

    // Step 4: export, unless the guard fired this cycle.
    if zfc {
        outcome.export_skipped_reason = Some("stale database imported; export skipped".into());
    } else {
        export_to_path(store, &paths.jsonl_path())?;
        outcome.exported = true;

        if config.deletions.auto_compact {
            let referenced: HashSet<String> = store
                .list_issues(&beads_core::filter::IssueFilter {
                    include_tombstones: true,
                    ..Default::default()
                })?
                .into_iter()
                .map(|i| i.id)
                .collect();
            auto_compact_deletions(
                &paths.deletions_path(),
                config.deletions.auto_compact_threshold,
                config.deletions.retention_days,
                &referenced,
                chrono::Utc::now(),
            )?;
        }
    }

    // Step 5: commit to the sync branch.
    if let Some(root) = repo_root {
        if beads_git::is_repo(root) {
            outcome.committed = commit_journal(root, paths, &config.sync.branch)?;
        }
    }

    Ok(outcome)
}

/// Reads the journal; a conflict-marker failure on exactly the journal file
/// is auto-resolved through the merge engine, anything wider is surfaced.
fn read_journal_or_resolve(
    journal_path: &Path,
    repo_root: Option<&Path>,
) -> Result<Vec<JournalRecord>> {
    match read_journal_file(journal_path) {
        Ok(records) => Ok(records),
        Err(SyncError::Journal(JournalError::ConflictMarker { line })) => {
            let Some(root) = repo_root.filter(|r| beads_git::is_repo(r)) else {
                return Err(SyncError::Journal(JournalError::ConflictMarker { line }));
            };
            let conflicted = beads_git::conflicted_paths(root)?;
            let rel = journal_path
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            if conflicted.len() != 1 || conflicted[0] != rel {
                // Multi-file conflicts are never auto-resolved.
                return Err(SyncError::UnresolvedConflicts(conflicted));
            }
            info!(path = %rel, "auto-resolving journal-only merge conflict");
            resolve_journal_conflict(root, &rel, journal_path)
        }
        Err(other) => Err(other),
    }
}

/// Merges the three index stages of a conflicted journal record-by-record
/// and rewrites the working-tree file with the result.
fn resolve_journal_conflict(
    root: &Path,
    rel: &str,
    journal_path: &Path,
) -> Result<Vec<JournalRecord>> {
    let parse_stage = |stage: u8| -> Result<Vec<JournalRecord>> {
        let spec = format!(":{stage}:{rel}");
        match beads_git::git_command(&["show", &spec], root) {
            Ok(text) => read_all(text.as_bytes()),
            // A stage can be absent (add/add conflicts have no base).
            Err(_) => Ok(Vec::new()),
        }
    };
    let base = parse_stage(1)?;
    let ours = parse_stage(2)?;
    let theirs = parse_stage(3)?;

    let base_map: std::collections::HashMap<String, &JournalRecord> =
        base.iter().map(|r| (r.id().to_owned(), r)).collect();
    let ours_map: std::collections::HashMap<String, &JournalRecord> =
        ours.iter().map(|r| (r.id().to_owned(), r)).collect();
    let theirs_map: std::collections::HashMap<String, &JournalRecord> =
        theirs.iter().map(|r| (r.id().to_owned(), r)).collect();

    let mut merged: Vec<JournalRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for record in ours.iter().chain(theirs.iter()) {
        let id = record.id().to_owned();
        if !seen.insert(id.clone()) {
            continue;
        }
        let merged_record = match (ours_map.get(&id), theirs_map.get(&id)) {
            (Some(JournalRecord::Bead(o)), Some(JournalRecord::Bead(t))) => {
                let base_issue = match base_map.get(&id) {
                    Some(JournalRecord::Bead(b)) => Some(b.as_ref()),
                    _ => None,
                };
                let (winner, _) = three_way_merge(
                    base_issue,
                    o,
                    t,
                    beads_config::ConflictResolution::Timestamp,
                );
                JournalRecord::Bead(Box::new(winner))
            }
            (Some(r), _) | (_, Some(r)) => (*r).clone(),
            (None, None) => continue,
        };
        merged.push(merged_record);
    }

    let bytes = beads_core::journal::canonical_bytes(&merged)?;
    std::fs::write(journal_path, &bytes)?;
    beads_git::git_command(&["add", "--", rel], root)?;
    debug!(records = merged.len(), "journal conflict resolved");
    read_all(&bytes)
}

fn read_all(bytes: &[u8]) -> Result<Vec<JournalRecord>> {
    let mut records = Vec::new();
    for record in beads_core::journal::read_journal(bytes) {
        records.push(record?);
    }
    Ok(records)
}

/// Commits the journal and deletion manifest, relative to the repo root.
fn commit_journal(root: &Path, paths: &WorkspacePaths, branch: &str) -> Result<bool> {
    let mut rel_paths: Vec<String> = Vec::new();
    for path in [paths.jsonl_path(), paths.deletions_path()] {
        if !path.exists() {
            continue;
        }
        match path.strip_prefix(root) {
            Ok(rel) => rel_paths.push(rel.to_string_lossy().to_string()),
            Err(_) => {
                // Redirected workspace outside the repo: nothing to commit.
                debug!(path = %path.display(), "journal outside repo; skipping commit");
                return Ok(false);
            }
        }
    }
    if rel_paths.is_empty() {
        return Ok(false);
    }
    let refs: Vec<&str> = rel_paths.iter().map(String::as_str).collect();
    let committed = beads_git::commit_paths(root, &refs, "bd: sync journal", branch)?;
    Ok(committed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;
    use beads_storage::SqliteStore;

    fn workspace() -> (tempfile::TempDir, WorkspacePaths) {
        let dir = tempfile::tempdir().unwrap();
        let beads_dir = dir.path().join(".beads");
        std::fs::create_dir_all(&beads_dir).unwrap();
        let paths = WorkspacePaths::new(beads_dir);
        (dir, paths)
    }

    fn seeded_store(n: usize) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_config("issue_prefix", "bd").unwrap();
        for i in 0..n {
            let issue = IssueBuilder::new(format!("Issue {i}"))
                .id(format!("bd-n{i:03}"))
                .build();
            store.create_issue(&issue, "alice").unwrap();
        }
        store
    }

    #[test]
    fn zfc_threshold() {
        assert!(!zfc_triggered(10, 10));
        assert!(!zfc_triggered(15, 10)); // exactly 1.5x: not strictly greater
        assert!(zfc_triggered(16, 10));
        assert!(zfc_triggered(100, 10));
        // Empty journal never triggers the guard.
        assert!(!zfc_triggered(100, 0));
    }

    #[test]
    fn first_sync_exports() {
        let (_dir, paths) = workspace();
        let store = seeded_store(3);
        let config = BeadsConfig::default();

        let outcome = sync_cycle(&store, &paths, &config, None, "alice").unwrap();
        assert!(outcome.exported);
        assert!(outcome.imported.is_none());
        assert!(paths.jsonl_path().exists());
        assert!(paths.left_snapshot_path().exists());
        // Lock released.
        assert!(!paths.sync_lock_path().exists());
    }

    #[test]
    fn remote_change_triggers_import() {
        let (_dir, paths) = workspace();
        let store = seeded_store(1);
        let config = BeadsConfig::default();

        // First cycle establishes the baseline.
        sync_cycle(&store, &paths, &config, None, "alice").unwrap();

        // Simulate a pulled change: append a new bead line.
        let extra = serde_json::to_string(
            &IssueBuilder::new("From remote").id("bd-rem01").build(),
        )
        .unwrap();
        let mut text = std::fs::read_to_string(paths.jsonl_path()).unwrap();
        text.push_str(&extra);
        text.push('\n');
        std::fs::write(paths.jsonl_path(), text).unwrap();

        let outcome = sync_cycle(&store, &paths, &config, None, "alice").unwrap();
        let imported = outcome.imported.expect("import should run");
        assert_eq!(imported.created, 1);
        assert!(store.get_issue("bd-rem01").is_ok());
        assert!(outcome.exported);
    }

    #[test]
    fn stale_db_refuses_to_clobber() {
        let (_dir, paths) = workspace();

        // Journal written by a store with 10 beads.
        let journal_store = seeded_store(10);
        export_to_path(&journal_store, &paths.jsonl_path()).unwrap();
        let journal_hash =
            content_hash_hex(&std::fs::read(paths.jsonl_path()).unwrap());

        // Local DB diverged upward: 100 beads, no matching hash metadata.
        let store = seeded_store(100);
        let config = BeadsConfig::default();

        let outcome = sync_cycle(&store, &paths, &config, None, "alice").unwrap();
        assert!(outcome.imported.is_some());
        assert!(!outcome.exported);
        assert!(outcome.export_skipped_reason.is_some());

        // DB reconciled down to the journal's ten beads.
        assert_eq!(store.count_issues().unwrap(), 10);

        // Journal bytes untouched by the skipped export.
        let after = content_hash_hex(&std::fs::read(paths.jsonl_path()).unwrap());
        assert_eq!(after, journal_hash);
    }

    #[test]
    fn native_remote_never_writes_jsonl() {
        let (_dir, paths) = workspace();
        let store = seeded_store(2);
        let mut config = BeadsConfig::default();
        config.sync.mode = SyncMode::NativeRemote;

        let outcome = sync_cycle(&store, &paths, &config, None, "alice").unwrap();
        assert!(!outcome.exported);
        assert!(!paths.jsonl_path().exists());
    }

    #[test]
    fn unchanged_journal_skips_import() {
        let (_dir, paths) = workspace();
        let store = seeded_store(2);
        let config = BeadsConfig::default();

        sync_cycle(&store, &paths, &config, None, "alice").unwrap();
        let outcome = sync_cycle(&store, &paths, &config, None, "alice").unwrap();
        assert!(outcome.imported.is_none());
    }
}
