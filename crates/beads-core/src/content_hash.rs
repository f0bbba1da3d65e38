//! Deterministic content hashing for beads.
//!
//! Produces a SHA-256 hex digest over all substantive fields (excluding ID
//! and timestamps) so that identical content produces identical hashes
//! across all clones. Import uses this fingerprint to distinguish a true ID
//! collision (same ID, different content) from a converged re-creation.

use sha2::{Digest, Sha256};

use crate::issue::Issue;

/// Separator byte written between fields.
const SEP: u8 = 0;

/// Computes a deterministic content hash for a bead.
pub fn compute_content_hash(issue: &Issue) -> String {
    let mut h = Sha256::new();

    // Core fields in stable order.
    write_str(&mut h, &issue.title);
    write_str(&mut h, &issue.description);
    write_str(&mut h, &issue.design);
    write_str(&mut h, issue.status.as_str());
    write_int(&mut h, issue.priority);
    write_str(&mut h, issue.issue_type.as_str());
    write_str(&mut h, &issue.assignee);
    write_str(&mut h, &issue.created_by);

    // Optional fields.
    write_str_opt(&mut h, issue.external_ref.as_deref());
    if let Some(ref meta) = issue.metadata {
        write_str(&mut h, meta.get());
    } else {
        h.update([SEP]);
    }

    // Gate fields.
    write_str(&mut h, &issue.await_type);
    write_duration(&mut h, issue.timeout);

    // Labels participate sorted so insertion order never changes the hash.
    let mut labels = issue.labels.clone();
    labels.sort();
    labels.dedup();
    for label in &labels {
        write_str(&mut h, label);
    }

    format!("{:x}", h.finalize())
}

// -- helper writers --------------------------------------------------------

fn write_str(h: &mut Sha256, s: &str) {
    h.update(s.as_bytes());
    h.update([SEP]);
}

fn write_int(h: &mut Sha256, n: i32) {
    h.update(n.to_string().as_bytes());
    h.update([SEP]);
}

fn write_str_opt(h: &mut Sha256, s: Option<&str>) {
    if let Some(s) = s {
        h.update(s.as_bytes());
    }
    h.update([SEP]);
}

fn write_duration(h: &mut Sha256, d: Option<std::time::Duration>) {
    let ns = d.map(|d| d.as_nanos() as i64).unwrap_or(0);
    h.update(ns.to_string().as_bytes());
    h.update([SEP]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueBuilder;

    #[test]
    fn content_hash_deterministic() {
        let issue = IssueBuilder::new("Test issue")
            .description("A description")
            .priority(2)
            .build();

        let hash1 = compute_content_hash(&issue);
        let hash2 = compute_content_hash(&issue);
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 hex = 64 chars
    }

    #[test]
    fn content_hash_differs_on_change() {
        let issue1 = IssueBuilder::new("Title A").build();
        let issue2 = IssueBuilder::new("Title B").build();
        assert_ne!(compute_content_hash(&issue1), compute_content_hash(&issue2));
    }

    #[test]
    fn content_hash_ignores_id_and_timestamps() {
        let mut issue1 = IssueBuilder::new("Same content").build();
        let mut issue2 = IssueBuilder::new("Same content").build();

        issue1.id = "bd-aaa".into();
        issue2.id = "bd-bbb".into();
        issue1.created_at = chrono::Utc::now();
        issue2.created_at = chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);

        assert_eq!(compute_content_hash(&issue1), compute_content_hash(&issue2));
    }

    #[test]
    fn content_hash_label_order_invariant() {
        let issue1 = IssueBuilder::new("x")
            .labels(vec!["b".into(), "a".into()])
            .build();
        let issue2 = IssueBuilder::new("x")
            .labels(vec!["a".into(), "b".into()])
            .build();
        assert_eq!(compute_content_hash(&issue1), compute_content_hash(&issue2));
    }

    #[test]
    fn content_hash_sees_priority() {
        let issue1 = IssueBuilder::new("x").priority(0).build();
        let issue2 = IssueBuilder::new("x").priority(1).build();
        assert_ne!(compute_content_hash(&issue1), compute_content_hash(&issue2));
    }
}
