//! On-disk journal file management: reading journals, the left snapshot,
//! and the append-only deletion manifest.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use beads_core::journal::{
    canonical_bytes, read_journal, DeletionMarker, JournalRecord,
};
use beads_storage::Storage;

use crate::error::Result;
use crate::export::collect_journal_records;

/// Reads every record from a journal file; a missing file is an empty
/// journal.
pub fn read_journal_file(path: &Path) -> Result<Vec<JournalRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for record in read_journal(reader) {
        records.push(record?);
    }
    Ok(records)
}

/// Writes the current store state to the left-snapshot path.
///
/// The snapshot is the authoritative record of "ours" taken just before a
/// pull; deletion application protects every ID found here.
pub fn write_left_snapshot(store: &dyn Storage, path: &Path) -> Result<Vec<JournalRecord>> {
    let records = collect_journal_records(store)?;
    let bytes = canonical_bytes(&records)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    debug!(path = %path.display(), beads = records.len(), "wrote left snapshot");
    Ok(records)
}

/// The set of bead IDs recorded in a journal file.
pub fn journal_ids(path: &Path) -> Result<HashSet<String>> {
    Ok(read_journal_file(path)?
        .iter()
        .map(|r| r.id().to_owned())
        .collect())
}

// ---------------------------------------------------------------------------
// Deletion manifest
// ---------------------------------------------------------------------------

/// Appends a deletion marker to the manifest.
pub fn append_deletion(path: &Path, id: &str, now: DateTime<Utc>) -> Result<()> {
    let marker = DeletionMarker::new(id, now);
    let line = serde_json::to_string(&marker).map_err(|e| {
        beads_core::journal::JournalError::Json { line: 0, source: e }
    })?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Reads all deletion markers from the manifest. Bead records in the file
/// are ignored; only markers count.
pub fn read_deletion_manifest(path: &Path) -> Result<Vec<DeletionMarker>> {
    let mut markers = Vec::new();
    for record in read_journal_file(path)? {
        if let JournalRecord::Deletion(marker) = record {
            markers.push(marker);
        }
    }
    Ok(markers)
}

/// The IDs named by the deletion manifest.
pub fn deletion_manifest_ids(path: &Path) -> Result<Vec<String>> {
    Ok(read_deletion_manifest(path)?
        .into_iter()
        .map(|m| m.id)
        .collect())
}

/// Compacts the manifest when it exceeds `threshold` entries.
///
/// Entries older than `retention_days` are dropped, except those whose ID is
/// still referenced elsewhere in the workspace (`referenced_ids`). Entries
/// newer than the retention cutoff are never touched. Returns the number of
/// entries dropped.
pub fn auto_compact_deletions(
    path: &Path,
    threshold: usize,
    retention_days: i64,
    referenced_ids: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<usize> {
    let markers = read_deletion_manifest(path)?;
    if markers.len() <= threshold {
        return Ok(0);
    }

    let cutoff = now - Duration::days(retention_days);
    let (kept, dropped): (Vec<_>, Vec<_>) = markers.into_iter().partition(|m| {
        let age_ok = m.deleted_at.map(|t| t >= cutoff).unwrap_or(true);
        age_ok || referenced_ids.contains(&m.id)
    });

    if dropped.is_empty() {
        return Ok(0);
    }

    let records: Vec<JournalRecord> = kept.into_iter().map(JournalRecord::Deletion).collect();
    let bytes = canonical_bytes(&records)?;
    std::fs::write(path, &bytes)?;
    info!(dropped = dropped.len(), "compacted deletion manifest");
    Ok(dropped.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;
    use beads_storage::{SqliteStore, Storage};

    #[test]
    fn manifest_append_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deletions.jsonl");

        append_deletion(&path, "bd-1", Utc::now()).unwrap();
        append_deletion(&path, "bd-2", Utc::now()).unwrap();

        let ids = deletion_manifest_ids(&path).unwrap();
        assert_eq!(ids, vec!["bd-1".to_string(), "bd-2".to_string()]);
    }

    #[test]
    fn missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ids = deletion_manifest_ids(&dir.path().join("deletions.jsonl")).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn left_snapshot_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .create_issue(&IssueBuilder::new("Here").id("bd-here").build(), "alice")
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.left.jsonl");
        write_left_snapshot(&store, &path).unwrap();

        let ids = journal_ids(&path).unwrap();
        assert!(ids.contains("bd-here"));
    }

    #[test]
    fn compaction_respects_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deletions.jsonl");
        let old = Utc::now() - Duration::days(90);
        for i in 0..5 {
            append_deletion(&path, &format!("bd-old{i}"), old).unwrap();
        }

        // Below threshold: untouched.
        let dropped =
            auto_compact_deletions(&path, 10, 30, &HashSet::new(), Utc::now()).unwrap();
        assert_eq!(dropped, 0);
        assert_eq!(deletion_manifest_ids(&path).unwrap().len(), 5);
    }

    #[test]
    fn compaction_drops_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deletions.jsonl");
        let old = Utc::now() - Duration::days(90);
        for i in 0..3 {
            append_deletion(&path, &format!("bd-old{i}"), old).unwrap();
        }
        append_deletion(&path, "bd-fresh", Utc::now()).unwrap();

        let dropped =
            auto_compact_deletions(&path, 2, 30, &HashSet::new(), Utc::now()).unwrap();
        assert_eq!(dropped, 3);

        let ids = deletion_manifest_ids(&path).unwrap();
        assert_eq!(ids, vec!["bd-fresh".to_string()]);
    }

    #[test]
    fn compaction_keeps_referenced_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deletions.jsonl");
        let old = Utc::now() - Duration::days(90);
        append_deletion(&path, "bd-ref", old).unwrap();
        append_deletion(&path, "bd-unref", old).unwrap();
        append_deletion(&path, "bd-unref2", old).unwrap();

        let referenced: HashSet<String> = ["bd-ref".to_string()].into_iter().collect();
        let dropped = auto_compact_deletions(&path, 1, 30, &referenced, Utc::now()).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(deletion_manifest_ids(&path).unwrap(), vec!["bd-ref".to_string()]);
    }
}
