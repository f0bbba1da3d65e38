//! Error type for sync, import, and export operations.

use std::collections::BTreeMap;

/// Errors produced by the journal, import, and orchestration layers.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Journal parse or encode failure.
    #[error(transparent)]
    Journal(#[from] beads_core::journal::JournalError),

    /// Underlying storage failure.
    #[error(transparent)]
    Storage(#[from] beads_storage::StorageError),

    /// Git subprocess failure.
    #[error(transparent)]
    Git(#[from] beads_git::GitError),

    /// Sync lock contention.
    #[error(transparent)]
    Lock(#[from] beads_lockfile::LockError),

    /// Workspace configuration failure.
    #[error(transparent)]
    Config(#[from] beads_config::ConfigError),

    /// Filesystem failure on a journal file.
    #[error("journal file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Incoming records carry foreign workspace prefixes.
    ///
    /// Carries per-prefix counts so the caller can drive the
    /// `--rename-on-import` flow.
    #[error("incoming beads carry foreign prefixes {0:?}; re-run with --rename-on-import or set skip_prefix_validation")]
    PrefixMismatch(BTreeMap<String, usize>),

    /// Same ID, semantically different content, and renaming was disabled.
    #[error("ID collisions detected for {0:?}; re-run with --rename-on-import to assign fresh IDs")]
    CollisionDetected(Vec<String>),

    /// A strict-mode dependency referenced an unknown bead.
    #[error("dependency {issue_id} -> {depends_on_id} references an unknown bead (strict mode)")]
    UnknownDependency {
        issue_id: String,
        depends_on_id: String,
    },

    /// The staleness guard refused a write path.
    #[error("refusing to export stale database: {reason}; run `bd import` first")]
    StaleDb { reason: String },

    /// A git merge left conflicts the orchestrator cannot auto-resolve.
    #[error("unresolved git conflicts in {0:?}; resolve them manually, then re-run sync")]
    UnresolvedConflicts(Vec<String>),

    /// External tracker failure.
    #[error("tracker error: {0}")]
    Tracker(String),
}

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
