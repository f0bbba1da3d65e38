//! SQLite storage backend, split into per-entity operation modules.

pub mod config;
pub mod decisions;
pub mod dependencies;
pub mod issues;
pub mod labels;
pub mod queries;
pub mod schema;
pub mod store;
pub mod transaction;

pub use store::SqliteStore;
