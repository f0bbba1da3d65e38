//! JSONL journal codec.
//!
//! Each line in a journal file is exactly one of:
//! 1. A bead record (full JSON object with nested `labels`, `dependencies`
//!    and an optional `decision_point` sub-object).
//! 2. A tombstone record (a bead with `status: "tombstone"`).
//! 3. A deletion marker `{"id": ..., "_deleted": true, "_deleted_at": ...}`.
//!
//! Canonical form: lines sorted by ID, trailing newline, UTF-8 without BOM.
//! A SHA-256 over the canonical bytes is the primary staleness signal.

use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::issue::Issue;

/// Error type for journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error at line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },

    /// A three-way merge left conflict markers in the file. Import must not
    /// guess; the caller is told how to recover.
    #[error(
        "git conflict marker at line {line}: resolve the merge conflict in the \
         journal file (or check out one side), then re-run import"
    )]
    ConflictMarker { line: usize },
}

/// Result alias for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Compact record propagating deletion intent ahead of the full tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionMarker {
    pub id: String,

    #[serde(rename = "_deleted")]
    pub deleted: bool,

    #[serde(
        rename = "_deleted_at",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DeletionMarker {
    /// Creates a marker for the given bead ID at `now`.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            deleted: true,
            deleted_at: Some(now),
        }
    }
}

/// One parsed journal line.
#[derive(Debug, Clone)]
pub enum JournalRecord {
    Bead(Box<Issue>),
    Deletion(DeletionMarker),
}

impl JournalRecord {
    /// The primary key of the record, used for canonical ordering.
    pub fn id(&self) -> &str {
        match self {
            Self::Bead(issue) => &issue.id,
            Self::Deletion(marker) => &marker.id,
        }
    }
}

/// Prefixes that mark an unresolved three-way merge.
const CONFLICT_MARKERS: [&str; 3] = ["<<<<<<<", "=======", ">>>>>>>"];

/// Parses a single journal line.
///
/// The `_deleted` discriminator decides between a marker and a bead record;
/// bead defaults are applied after deserialization.
pub fn parse_line(line: &str, line_number: usize) -> Result<JournalRecord> {
    let trimmed = line.trim();
    if CONFLICT_MARKERS.iter().any(|m| trimmed.starts_with(m)) {
        return Err(JournalError::ConflictMarker { line: line_number });
    }

    // Peek at the discriminator before committing to a full Issue parse.
    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| JournalError::Json {
            line: line_number,
            source: e,
        })?;

    if value.get("_deleted").and_then(|v| v.as_bool()) == Some(true) {
        let marker: DeletionMarker =
            serde_json::from_value(value).map_err(|e| JournalError::Json {
                line: line_number,
                source: e,
            })?;
        return Ok(JournalRecord::Deletion(marker));
    }

    let mut issue: Issue = serde_json::from_value(value).map_err(|e| JournalError::Json {
        line: line_number,
        source: e,
    })?;
    issue.set_defaults();
    Ok(JournalRecord::Bead(Box::new(issue)))
}

/// Returns an iterator that reads records from a JSONL reader.
///
/// Each line is parsed as a JSON object. Empty lines are skipped.
pub fn read_journal<R: BufRead>(reader: R) -> JournalIter<R> {
    JournalIter {
        reader,
        line_number: 0,
    }
}

/// Iterator over JSONL-encoded journal records.
pub struct JournalIter<R> {
    reader: R,
    line_number: usize,
}

impl<R: BufRead> Iterator for JournalIter<R> {
    type Item = Result<JournalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None, // EOF
                Ok(_) => {
                    self.line_number += 1;
                    if line.trim().is_empty() {
                        continue; // skip empty lines
                    }
                    return Some(parse_line(&line, self.line_number));
                }
                Err(e) => return Some(Err(JournalError::Io(e))),
            }
        }
    }
}

/// Serializes records into canonical journal bytes: one JSON object per line,
/// sorted by ID, trailing newline.
pub fn canonical_bytes(records: &[JournalRecord]) -> Result<Vec<u8>> {
    let mut sorted: Vec<&JournalRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.id().cmp(b.id()));

    let mut buf = Vec::new();
    for record in sorted {
        match record {
            JournalRecord::Bead(issue) => {
                serde_json::to_writer(&mut buf, issue.as_ref())
                    .map_err(|e| JournalError::Json { line: 0, source: e })?;
            }
            JournalRecord::Deletion(marker) => {
                serde_json::to_writer(&mut buf, marker)
                    .map_err(|e| JournalError::Json { line: 0, source: e })?;
            }
        }
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Writes records in canonical form to the given writer.
pub fn write_journal<W: Write>(writer: &mut W, records: &[JournalRecord]) -> Result<()> {
    let bytes = canonical_bytes(records)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// SHA-256 hex digest over journal bytes.
///
/// Stored in metadata as `jsonl_content_hash`; counts can coincide while
/// content differs, so the hash is the staleness signal of record.
pub fn content_hash_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Counts the bead records (including tombstones) in journal bytes without
/// fully materializing them. Parse failures end the count early.
pub fn count_bead_lines(bytes: &[u8]) -> usize {
    read_journal(bytes)
        .filter_map(|r| r.ok())
        .filter(|r| matches!(r, JournalRecord::Bead(_)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Status;
    use crate::issue::IssueBuilder;
    use std::io::BufReader;

    #[test]
    fn write_and_read_roundtrip() {
        let records = vec![
            JournalRecord::Bead(Box::new(
                IssueBuilder::new("Issue 1").id("bd-001").priority(1).build(),
            )),
            JournalRecord::Bead(Box::new(
                IssueBuilder::new("Issue 2").id("bd-002").priority(2).build(),
            )),
        ];

        let mut buf = Vec::new();
        write_journal(&mut buf, &records).unwrap();

        let reader = BufReader::new(buf.as_slice());
        let read_back: Vec<JournalRecord> = read_journal(reader)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(read_back.len(), 2);
        match &read_back[0] {
            JournalRecord::Bead(i) => assert_eq!(i.title, "Issue 1"),
            other => panic!("expected bead, got {:?}", other),
        }
    }

    #[test]
    fn canonical_bytes_sorted_with_trailing_newline() {
        let records = vec![
            JournalRecord::Bead(Box::new(IssueBuilder::new("B").id("bd-bbb").build())),
            JournalRecord::Bead(Box::new(IssueBuilder::new("A").id("bd-aaa").build())),
        ];
        let bytes = canonical_bytes(&records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with('\n'));
        let first = text.lines().next().unwrap();
        assert!(first.contains("bd-aaa"));
    }

    #[test]
    fn canonical_bytes_stable_hash() {
        let records = vec![
            JournalRecord::Bead(Box::new(IssueBuilder::new("B").id("bd-bbb").build())),
            JournalRecord::Bead(Box::new(IssueBuilder::new("A").id("bd-aaa").build())),
        ];
        let reversed: Vec<JournalRecord> = records.iter().rev().cloned().collect();
        let h1 = content_hash_hex(&canonical_bytes(&records).unwrap());
        let h2 = content_hash_hex(&canonical_bytes(&reversed).unwrap());
        assert_eq!(h1, h2);
    }

    #[test]
    fn deletion_marker_line() {
        let line = r#"{"id":"bd-zap","_deleted":true,"_deleted_at":"2024-06-01T00:00:00Z"}"#;
        match parse_line(line, 1).unwrap() {
            JournalRecord::Deletion(m) => {
                assert_eq!(m.id, "bd-zap");
                assert!(m.deleted);
                assert!(m.deleted_at.is_some());
            }
            other => panic!("expected deletion marker, got {:?}", other),
        }
    }

    #[test]
    fn tombstone_line_is_a_bead() {
        let line = r#"{"id":"bd-ts1","title":"gone","status":"tombstone","deleted_by":"alice"}"#;
        match parse_line(line, 1).unwrap() {
            JournalRecord::Bead(i) => {
                assert_eq!(i.status, Status::Tombstone);
                assert_eq!(i.deleted_by, "alice");
            }
            other => panic!("expected bead, got {:?}", other),
        }
    }

    #[test]
    fn conflict_marker_detected() {
        for marker in ["<<<<<<< HEAD", "=======", ">>>>>>> theirs"] {
            match parse_line(marker, 7) {
                Err(JournalError::ConflictMarker { line }) => assert_eq!(line, 7),
                other => panic!("expected ConflictMarker, got {:?}", other),
            }
        }
    }

    #[test]
    fn read_skips_empty_lines() {
        let data = b"{\"title\":\"A\",\"id\":\"bd-a\"}\n\n{\"title\":\"B\",\"id\":\"bd-b\"}\n";
        let reader = BufReader::new(data.as_slice());
        let results: Vec<JournalRecord> = read_journal(reader)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn read_reports_line_number_on_error() {
        let data = b"{\"title\":\"A\",\"id\":\"bd-a\"}\nnot-json\n";
        let reader = BufReader::new(data.as_slice());
        let results: Vec<_> = read_journal(reader).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(JournalError::Json { line, .. }) => assert_eq!(*line, 2),
            other => panic!("expected JSON error, got {:?}", other),
        }
    }

    #[test]
    fn count_bead_lines_ignores_markers() {
        let data = b"{\"id\":\"bd-a\",\"title\":\"A\"}\n{\"id\":\"bd-b\",\"_deleted\":true}\n";
        assert_eq!(count_bead_lines(data), 1);
    }
}
