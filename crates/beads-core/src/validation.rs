//! Bead validation rules.

use crate::enums::Status;
use crate::issue::Issue;
use crate::schema::{SchemaViolation, TypeSchema};

/// Error type for validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    TitleRequired,

    #[error("title must be 500 characters or less (got {0})")]
    TitleTooLong(usize),

    #[error("priority must be between 0 and 4 (got {0})")]
    InvalidPriority(i32),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid issue type: {0}")]
    InvalidIssueType(String),

    #[error("invalid label '{0}': labels match [-a-zA-Z0-9_:*]+")]
    InvalidLabel(String),

    #[error("closed issues must have closed_at timestamp")]
    ClosedWithoutTimestamp,

    #[error("non-closed issues cannot have closed_at timestamp")]
    NotClosedWithTimestamp,

    #[error("tombstones must have deleted_at timestamp")]
    TombstoneWithoutTimestamp,

    #[error("metadata must be valid JSON")]
    InvalidMetadata,

    #[error("schema violation for type '{issue_type}': {details}")]
    Schema {
        issue_type: String,
        details: String,
    },
}

/// Returns `true` if every character of the label is in the allowed set.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '*'))
}

/// Validates a bead using built-in rules only.
pub fn validate(issue: &Issue) -> Result<(), ValidationError> {
    validate_with_custom(issue, &[])
}

/// Validates a bead, allowing the given custom types.
pub fn validate_with_custom(issue: &Issue, custom_types: &[&str]) -> Result<(), ValidationError> {
    // Title required.
    if issue.title.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    // Title max 500 chars.
    if issue.title.len() > 500 {
        return Err(ValidationError::TitleTooLong(issue.title.len()));
    }
    // Priority 0-4.
    if issue.priority < 0 || issue.priority > 4 {
        return Err(ValidationError::InvalidPriority(issue.priority));
    }
    // Status must be one of the closed set.
    if !issue.status.is_builtin() {
        return Err(ValidationError::InvalidStatus(
            issue.status.as_str().to_owned(),
        ));
    }
    // IssueType must be built-in or registered.
    if !issue.issue_type.is_valid_with_custom(custom_types) {
        return Err(ValidationError::InvalidIssueType(
            issue.issue_type.as_str().to_owned(),
        ));
    }
    // Labels must match the allowed character set.
    for label in &issue.labels {
        if !is_valid_label(label) {
            return Err(ValidationError::InvalidLabel(label.clone()));
        }
    }
    // Closed-at invariant.
    if issue.status == Status::Closed && issue.closed_at.is_none() {
        return Err(ValidationError::ClosedWithoutTimestamp);
    }
    if issue.status == Status::Open && issue.closed_at.is_some() {
        return Err(ValidationError::NotClosedWithTimestamp);
    }
    // Tombstones carry their deletion time.
    if issue.status == Status::Tombstone && issue.deleted_at.is_none() {
        return Err(ValidationError::TombstoneWithoutTimestamp);
    }
    // Metadata must be valid JSON if set.
    if let Some(ref meta) = issue.metadata {
        if serde_json::from_str::<serde_json::Value>(meta.get()).is_err() {
            return Err(ValidationError::InvalidMetadata);
        }
    }

    Ok(())
}

/// Validates a bead against an optional type schema, after the built-in rules.
pub fn validate_against_schema(
    issue: &Issue,
    schema: Option<&TypeSchema>,
) -> Result<(), ValidationError> {
    let Some(schema) = schema else {
        return Ok(());
    };
    let violations = schema.check(issue);
    if violations.is_empty() {
        return Ok(());
    }
    let details = violations
        .iter()
        .map(SchemaViolation::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(ValidationError::Schema {
        issue_type: issue.issue_type.as_str().to_owned(),
        details,
    })
}
