//! Plain-text and JSON output helpers.

use beads_core::issue::Issue;

/// Prints a value as pretty JSON.
pub fn output_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

/// One-line summary of a bead for list output.
pub fn issue_line(issue: &Issue) -> String {
    let labels = if issue.labels.is_empty() {
        String::new()
    } else {
        format!(" [{}]", issue.labels.join(","))
    };
    let assignee = if issue.assignee.is_empty() {
        String::new()
    } else {
        format!(" @{}", issue.assignee)
    };
    format!(
        "{}  P{}  {:<12}  {}{}{}",
        issue.id, issue.priority, issue.status, issue.title, assignee, labels
    )
}

/// Multi-line detail view of a bead for `bd show`.
pub fn issue_detail(issue: &Issue) -> String {
    let mut out = format!("{}: {}\n", issue.id, issue.title);
    out.push_str(&format!(
        "Status: {}  Priority: P{}  Type: {}\n",
        issue.status, issue.priority, issue.issue_type
    ));
    if !issue.assignee.is_empty() {
        out.push_str(&format!("Assignee: {}\n", issue.assignee));
    }
    if !issue.labels.is_empty() {
        out.push_str(&format!("Labels: {}\n", issue.labels.join(", ")));
    }
    if let Some(ref ext) = issue.external_ref {
        out.push_str(&format!("External: {ext}\n"));
    }
    out.push_str(&format!("Created: {} by {}\n", issue.created_at.to_rfc3339(), issue.created_by));
    out.push_str(&format!("Updated: {}\n", issue.updated_at.to_rfc3339()));
    if let Some(closed_at) = issue.closed_at {
        out.push_str(&format!("Closed: {}", closed_at.to_rfc3339()));
        if !issue.close_reason.is_empty() {
            out.push_str(&format!(" ({})", issue.close_reason));
        }
        out.push('\n');
    }
    if !issue.description.is_empty() {
        out.push_str(&format!("\n{}\n", issue.description));
    }
    if !issue.dependencies.is_empty() {
        out.push_str("\nDependencies:\n");
        for dep in &issue.dependencies {
            out.push_str(&format!("  {} {} {}\n", dep.issue_id, dep.dep_type, dep.depends_on_id));
        }
    }
    out
}

/// Parses a human duration: `45s`, `30m`, `2h`, `1d`, or bare seconds.
pub fn parse_duration_secs(raw: &str) -> anyhow::Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        anyhow::bail!("empty duration");
    }
    let (value, unit) = match raw.char_indices().rfind(|(_, c)| c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx + 1),
        None => anyhow::bail!("invalid duration '{raw}'"),
    };
    let n: u64 = value.parse()?;
    let secs = match unit.trim() {
        "" | "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        "d" => n * 86_400,
        other => anyhow::bail!("unknown duration unit '{other}' in '{raw}'"),
    };
    Ok(secs)
}
