//! Journal sanitization: applying deletion intent to a record set without
//! losing protected or canonical data.
//!
//! The same protection rules drive both this pass and the import engine's
//! deletion step: an ID present in the left snapshot is local state and must
//! not be erased by a stale marker, and a tombstone IS the canonical
//! deletion record, so removing it would resurrect the bead on the next
//! exchange.

use std::collections::HashSet;

use tracing::debug;

use beads_core::journal::JournalRecord;

/// Outcome of a sanitization pass.
#[derive(Debug, Default)]
pub struct SanitizeResult {
    /// The surviving records, original order preserved.
    pub records: Vec<JournalRecord>,
    /// IDs actually removed.
    pub removed_ids: Vec<String>,
    /// IDs listed for deletion but left alone (left-snapshot protection).
    pub protected_ids: Vec<String>,
}

/// Applies `deletion_ids` to a record set.
///
/// - IDs also present in `left_ids` are protected and kept.
/// - Tombstone records are kept (they are the deletion).
/// - Everything else named by `deletion_ids` is removed.
pub fn sanitize_records(
    records: Vec<JournalRecord>,
    deletion_ids: &HashSet<String>,
    left_ids: &HashSet<String>,
) -> SanitizeResult {
    let mut result = SanitizeResult::default();

    for record in records {
        let id = record.id().to_owned();
        if !deletion_ids.contains(&id) {
            result.records.push(record);
            continue;
        }

        if left_ids.contains(&id) {
            // Local state wins over deletion intent: a freshly created bead
            // whose hash ID matches a previously deleted one must survive.
            if !result.protected_ids.contains(&id) {
                result.protected_ids.push(id);
            }
            result.records.push(record);
            continue;
        }

        if let JournalRecord::Bead(ref issue) = record {
            if issue.is_tombstone() {
                debug!(id, "keeping tombstone named by deletion manifest");
                result.records.push(record);
                continue;
            }
        }

        result.removed_ids.push(id);
    }

    result
}
