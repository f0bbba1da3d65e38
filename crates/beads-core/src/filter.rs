//! Query filters for listing and searching beads.

use crate::enums::{IssueType, Status};

/// Filter criteria applied to list/search queries.
///
/// `None` fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<Status>,
    pub issue_type: Option<IssueType>,
    pub priority: Option<i32>,
    pub assignee: Option<String>,
    pub label: Option<String>,
    /// Include tombstones (off by default).
    pub include_tombstones: bool,
    pub limit: Option<usize>,
}

impl IssueFilter {
    /// Filter that matches every live bead.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter restricted to a single status.
    pub fn with_status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unconstrained() {
        let f = IssueFilter::all();
        assert!(f.status.is_none());
        assert!(f.limit.is_none());
        assert!(!f.include_tombstones);
    }

    #[test]
    fn with_status() {
        let f = IssueFilter::with_status(Status::Open);
        assert_eq!(f.status, Some(Status::Open));
    }
}
