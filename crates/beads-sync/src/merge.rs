//! Three-way merge of bead records.
//!
//! The left snapshot is the base, the local store is "ours", and the
//! incoming journal record is "theirs". A side that matches the base is
//! unchanged, so the other side wins cleanly; only when both sides diverged
//! from the base does the configured [`ConflictResolution`] decide.

use beads_config::ConflictResolution;
use beads_core::content_hash::compute_content_hash;
use beads_core::issue::Issue;

/// Which side a merge selected. Exposed for import accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSide {
    Ours,
    Theirs,
}

/// Merges one bead three ways and reports which side won.
///
/// `base` is the record from the left snapshot, absent when the bead did not
/// exist locally before the pull.
pub fn three_way_merge(
    base: Option<&Issue>,
    ours: &Issue,
    theirs: &Issue,
    policy: ConflictResolution,
) -> (Issue, MergeSide) {
    let ours_hash = compute_content_hash(ours);
    let theirs_hash = compute_content_hash(theirs);

    // Identical content: prefer ours (keeps local timestamps stable).
    if ours_hash == theirs_hash {
        return (ours.clone(), MergeSide::Ours);
    }

    if let Some(base) = base {
        let base_hash = compute_content_hash(base);
        // Only the remote changed: clean fast-forward to theirs.
        if ours_hash == base_hash {
            return (theirs.clone(), MergeSide::Theirs);
        }
        // Only we changed: keep ours.
        if theirs_hash == base_hash {
            return (ours.clone(), MergeSide::Ours);
        }
    }

    // True conflict: both sides diverged (or there is no base).
    match policy {
        ConflictResolution::Local => (ours.clone(), MergeSide::Ours),
        ConflictResolution::External => (theirs.clone(), MergeSide::Theirs),
        ConflictResolution::Timestamp | ConflictResolution::Newer => {
            if theirs.updated_at > ours.updated_at {
                (theirs.clone(), MergeSide::Theirs)
            } else if theirs.updated_at < ours.updated_at {
                (ours.clone(), MergeSide::Ours)
            } else {
                // Equal timestamps: deterministic tiebreak so every clone
                // converges on the same winner.
                if theirs_hash < ours_hash {
                    (theirs.clone(), MergeSide::Theirs)
                } else {
                    (ours.clone(), MergeSide::Ours)
                }
            }
        }
    }
}
