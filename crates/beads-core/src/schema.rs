//! Type schemas -- per-type required fields and label patterns.
//!
//! A schema may be associated with any issue type (built-in or custom) and
//! is enforced on create and update.

use serde::{Deserialize, Serialize};

use crate::issue::Issue;

/// Declares what a bead of a given type must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// Field names that must be non-empty. Addressable fields:
    /// `description`, `assignee`, `design`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,

    /// Label patterns, `*` wildcards permitted (e.g. `team:*`). Each pattern
    /// must be matched by at least one label on the bead.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_labels: Vec<String>,
}

/// A single schema violation, suitable for user-facing error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// A required field is empty.
    MissingField(String),
    /// No label matched the required pattern.
    MissingLabel(String),
    /// The schema names a field the model does not have.
    UnknownField(String),
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "required field '{name}' is empty"),
            Self::MissingLabel(pattern) => {
                write!(f, "no label matches required pattern '{pattern}'")
            }
            Self::UnknownField(name) => write!(f, "schema references unknown field '{name}'"),
        }
    }
}

impl TypeSchema {
    /// Checks a bead against this schema, returning every violation.
    pub fn check(&self, issue: &Issue) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        for field in &self.required_fields {
            match field.as_str() {
                "description" => {
                    if issue.description.is_empty() {
                        violations.push(SchemaViolation::MissingField(field.clone()));
                    }
                }
                "assignee" => {
                    if issue.assignee.is_empty() {
                        violations.push(SchemaViolation::MissingField(field.clone()));
                    }
                }
                "design" => {
                    if issue.design.is_empty() {
                        violations.push(SchemaViolation::MissingField(field.clone()));
                    }
                }
                other => violations.push(SchemaViolation::UnknownField(other.to_owned())),
            }
        }

        for pattern in &self.required_labels {
            if !issue
                .labels
                .iter()
                .any(|label| matches_label_pattern(pattern, label))
            {
                violations.push(SchemaViolation::MissingLabel(pattern.clone()));
            }
        }

        violations
    }
}

/// Matches a label against a pattern with `*` wildcards.
///
/// `*` matches any run of characters (including the empty run); everything
/// else matches literally.
pub fn matches_label_pattern(pattern: &str, label: &str) -> bool {
    fn matches(p: &[u8], l: &[u8]) -> bool {
        match (p.first(), l.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                // Star consumes zero or more label bytes.
                matches(&p[1..], l) || (!l.is_empty() && matches(p, &l[1..]))
            }
            (Some(pc), Some(lc)) if pc == lc => matches(&p[1..], &l[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueBuilder;

    #[test]
    fn empty_schema_accepts_everything() {
        let schema = TypeSchema::default();
        let issue = IssueBuilder::new("x").build();
        assert!(schema.check(&issue).is_empty());
    }

    #[test]
    fn missing_required_field() {
        let schema = TypeSchema {
            required_fields: vec!["description".into()],
            required_labels: vec![],
        };
        let issue = IssueBuilder::new("x").build();
        assert_eq!(
            schema.check(&issue),
            vec![SchemaViolation::MissingField("description".into())]
        );

        let issue = IssueBuilder::new("x").description("present").build();
        assert!(schema.check(&issue).is_empty());
    }

    #[test]
    fn unknown_field_is_a_violation() {
        let schema = TypeSchema {
            required_fields: vec!["nonexistent".into()],
            required_labels: vec![],
        };
        let issue = IssueBuilder::new("x").build();
        assert_eq!(
            schema.check(&issue),
            vec![SchemaViolation::UnknownField("nonexistent".into())]
        );
    }

    #[test]
    fn required_label_literal() {
        let schema = TypeSchema {
            required_fields: vec![],
            required_labels: vec!["triage".into()],
        };
        let issue = IssueBuilder::new("x").labels(vec!["triage".into()]).build();
        assert!(schema.check(&issue).is_empty());

        let issue = IssueBuilder::new("x").labels(vec!["other".into()]).build();
        assert_eq!(schema.check(&issue).len(), 1);
    }

    #[test]
    fn required_label_wildcard() {
        let schema = TypeSchema {
            required_fields: vec![],
            required_labels: vec!["team:*".into()],
        };
        let issue = IssueBuilder::new("x")
            .labels(vec!["team:core".into()])
            .build();
        assert!(schema.check(&issue).is_empty());

        let issue = IssueBuilder::new("x").labels(vec!["team".into()]).build();
        assert_eq!(schema.check(&issue).len(), 1);
    }

    #[test]
    fn wildcard_matching() {
        assert!(matches_label_pattern("*", "anything"));
        assert!(matches_label_pattern("*", ""));
        assert!(matches_label_pattern("team:*", "team:core"));
        assert!(matches_label_pattern("team:*", "team:"));
        assert!(matches_label_pattern("*-urgent", "p0-urgent"));
        assert!(matches_label_pattern("a*c", "abc"));
        assert!(matches_label_pattern("a*c", "ac"));
        assert!(!matches_label_pattern("a*c", "ab"));
        assert!(!matches_label_pattern("team:*", "other:core"));
    }

    #[test]
    fn schema_serde_roundtrip() {
        let schema = TypeSchema {
            required_fields: vec!["description".into()],
            required_labels: vec!["team:*".into()],
        };
        let json = serde_json::to_string(&schema).unwrap();
        let back: TypeSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
