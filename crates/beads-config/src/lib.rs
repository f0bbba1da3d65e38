//! Workspace discovery and configuration for the beads system.

pub mod beads_dir;
pub mod config;

pub use beads_dir::{ensure_beads_dir, find_beads_dir, find_beads_dir_or_error, WorkspacePaths};
pub use config::{BeadsConfig, ConfigError, ConflictResolution, SyncMode, SyncTrigger};
