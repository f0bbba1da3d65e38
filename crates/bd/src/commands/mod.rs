//! Command handlers, one module per verb.

pub mod assign;
pub mod close;
pub mod config_cmd;
pub mod create;
pub mod daemon_cmd;
pub mod decision;
pub mod delete;
pub mod dep;
pub mod export;
pub mod formula;
pub mod import;
pub mod init;
pub mod label;
pub mod list;
pub mod ready;
pub mod reopen;
pub mod search;
pub mod show;
pub mod stale;
pub mod sync_cmd;
pub mod type_cmd;
pub mod types_cmd;
pub mod update;

use anyhow::{bail, Result};
use beads_core::filter::IssueFilter;
use beads_storage::Storage;

/// Resolves a full bead ID from an exact ID or a unique fragment
/// (prefix or slug suffix).
pub fn resolve_id(store: &dyn Storage, fragment: &str) -> Result<String> {
    if store.get_issue(fragment).is_ok() {
        return Ok(fragment.to_owned());
    }

    let all = store.list_issues(&IssueFilter {
        include_tombstones: true,
        ..Default::default()
    })?;
    let matches: Vec<&str> = all
        .iter()
        .map(|i| i.id.as_str())
        .filter(|id| id.starts_with(fragment) || id.ends_with(fragment))
        .collect();
    match matches.as_slice() {
        [] => bail!("no issue matches '{fragment}'"),
        [only] => Ok((*only).to_owned()),
        many => bail!("'{fragment}' is ambiguous: matches {}", many.join(", ")),
    }
}
