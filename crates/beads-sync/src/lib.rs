//! Journal export/import, the merge engine, and sync orchestration.
//!
//! This crate owns the journal files on disk (`beads.jsonl`,
//! `beads.left.jsonl`, `deletions.jsonl`), applies incoming records against
//! the store, and coordinates export -> commit -> pull -> import cycles with
//! git.

pub mod error;
pub mod export;
pub mod import;
pub mod journal_files;
pub mod merge;
pub mod orchestrator;
pub mod sanitize;
pub mod tracker;

pub use error::SyncError;
pub use export::{collect_journal_records, export_to_path};
pub use import::{import_records, ImportOptions, ImportResult, OrphanHandling};
pub use orchestrator::{sync_cycle, SyncOutcome};
pub use sanitize::{sanitize_records, SanitizeResult};
