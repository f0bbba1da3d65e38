//! End-to-end tests driving the `bd` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Runs `bd` inside `dir` with a fixed actor.
fn bd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bd").unwrap();
    cmd.current_dir(dir.path());
    cmd.env_remove("BEADS_DB");
    cmd.env_remove("BEADS_DIR");
    cmd.env("BD_ACTOR", "tester");
    cmd
}

fn init_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    bd(&dir)
        .args(["init", "--prefix", "proj"])
        .assert()
        .success();
    dir
}

/// Creates a bead and returns its ID.
fn create(dir: &TempDir, args: &[&str]) -> String {
    let output = bd(dir)
        .arg("create")
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "create failed: {output:?}");
    String::from_utf8(output.stdout).unwrap().trim().to_owned()
}

#[test]
fn init_is_idempotent_about_refusal() {
    let dir = init_workspace();
    // A second init refuses: the database already exists.
    bd(&dir)
        .args(["init", "--prefix", "proj"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn create_show_list_close_flow() {
    let dir = init_workspace();
    let id = create(&dir, &["Fix the flux capacitor", "-p", "1", "-l", "hardware"]);
    assert!(id.starts_with("proj-"), "unexpected id {id}");

    bd(&dir)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fix the flux capacitor"))
        .stdout(predicate::str::contains("P1"));

    bd(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&id));

    bd(&dir)
        .args(["close", &id, "--reason", "done"])
        .assert()
        .success();

    bd(&dir)
        .args(["list", "--status", "open"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id).not());

    bd(&dir).args(["reopen", &id]).assert().success();
    bd(&dir)
        .args(["list", "--status", "open"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id));
}

#[test]
fn dependency_gating_drives_ready() {
    let dir = init_workspace();
    let blocker = create(&dir, &["Blocker"]);
    let blocked = create(&dir, &["Blocked work"]);

    bd(&dir)
        .args(["dep", "add", &blocked, &blocker])
        .assert()
        .success();

    bd(&dir)
        .arg("ready")
        .assert()
        .success()
        .stdout(predicate::str::contains(&blocker))
        .stdout(predicate::str::contains(&blocked).not());

    // Cycles are refused.
    bd(&dir)
        .args(["dep", "add", &blocker, &blocked])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));

    bd(&dir).args(["close", &blocker]).assert().success();
    bd(&dir)
        .arg("ready")
        .assert()
        .success()
        .stdout(predicate::str::contains(&blocked));
}

#[test]
fn round_trip_export_import() {
    // Scenario: two beads with labels, an edge, and distinct priorities
    // survive export -> import into a fresh workspace byte-for-byte in
    // logical content.
    let source = init_workspace();
    let first = create(&source, &["First", "-p", "0", "-l", "x"]);
    let second = create(&source, &["Second", "-p", "1"]);
    bd(&source)
        .args(["dep", "add", &first, &second])
        .assert()
        .success();

    bd(&source).arg("export").assert().success();
    let journal = source.path().join(".beads").join("beads.jsonl");
    assert!(journal.exists());

    // Fresh workspace with the same prefix.
    let target = init_workspace();
    let dest = target.path().join(".beads").join("beads.jsonl");
    std::fs::copy(&journal, &dest).unwrap();

    bd(&target)
        .args(["import", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\": 2"));

    let show = bd(&target)
        .args(["show", &first, "--json"])
        .output()
        .unwrap();
    let issue: Value = serde_json::from_slice(&show.stdout).unwrap();
    assert_eq!(issue["title"], "First");
    assert_eq!(issue["priority"], 0);
    assert_eq!(issue["labels"][0], "x");
    assert_eq!(issue["dependencies"][0]["depends_on_id"], second);

    let show = bd(&target)
        .args(["show", &second, "--json"])
        .output()
        .unwrap();
    let issue: Value = serde_json::from_slice(&show.stdout).unwrap();
    assert_eq!(issue["priority"], 1);

    // Idempotence: importing the same journal again changes nothing.
    bd(&target)
        .args(["import", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\": 0"))
        .stdout(predicate::str::contains("\"unchanged\": 2"));
}

#[test]
fn import_rejects_foreign_prefix_without_rename() {
    let source = init_workspace();
    create(&source, &["Foreign bead"]);
    bd(&source).arg("export").assert().success();
    let journal = source.path().join(".beads").join("beads.jsonl");

    let target = TempDir::new().unwrap();
    bd(&target)
        .args(["init", "--prefix", "other"])
        .assert()
        .success();
    let dest = target.path().join(".beads").join("import-me.jsonl");
    std::fs::copy(&journal, &dest).unwrap();

    bd(&target)
        .args(["import", "--input", dest.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rename-on-import"));

    bd(&target)
        .args([
            "import",
            "--input",
            dest.to_str().unwrap(),
            "--rename-on-import",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\": 1"));

    // The imported bead now carries the local prefix.
    bd(&target)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("other-"));
}

#[test]
fn delete_writes_tombstone_and_marker() {
    let dir = init_workspace();
    let id = create(&dir, &["Doomed"]);

    bd(&dir).args(["delete", &id]).assert().success();

    // Gone from normal listings.
    bd(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&id).not());

    // The manifest carries the marker.
    let manifest =
        std::fs::read_to_string(dir.path().join(".beads").join("deletions.jsonl")).unwrap();
    assert!(manifest.contains(&id));
    assert!(manifest.contains("\"_deleted\":true"));

    // The journal export carries the tombstone.
    bd(&dir).arg("export").assert().success();
    let journal =
        std::fs::read_to_string(dir.path().join(".beads").join("beads.jsonl")).unwrap();
    assert!(journal.contains("tombstone"));
}

#[test]
fn stale_reports_old_beads_only() {
    let dir = init_workspace();
    create(&dir, &["Fresh bead"]);
    bd(&dir)
        .args(["stale", "--days", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No beads older"));
}

#[test]
fn sync_mode_surface() {
    let dir = init_workspace();
    bd(&dir)
        .args(["sync", "mode", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git-portable"))
        .stdout(predicate::str::contains("native-remote"));

    bd(&dir)
        .args(["sync", "mode", "current"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git-portable"));

    bd(&dir)
        .args(["sync", "mode", "set", "realtime"])
        .assert()
        .success();
    bd(&dir)
        .args(["sync", "mode", "current"])
        .assert()
        .success()
        .stdout(predicate::str::contains("realtime"));

    bd(&dir)
        .args(["sync", "mode", "set", "bogus"])
        .assert()
        .failure();
}

#[test]
fn sync_cycle_exports_journal() {
    let dir = init_workspace();
    create(&dir, &["To be synced"]);
    bd(&dir)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported"));
    assert!(dir.path().join(".beads").join("beads.jsonl").exists());
    assert!(dir.path().join(".beads").join("beads.left.jsonl").exists());
}

#[test]
fn type_schema_enforced_through_cli() {
    let dir = init_workspace();
    bd(&dir)
        .args(["type", "schema", "bug", "--require-field", "description"])
        .assert()
        .success();

    bd(&dir)
        .args(["create", "No description bug", "-t", "bug"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("description"));

    bd(&dir)
        .args(["create", "Described bug", "-t", "bug", "-d", "steps to reproduce"])
        .assert()
        .success();
}

#[test]
fn custom_types_registry() {
    let dir = init_workspace();
    bd(&dir)
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("task"))
        .stdout(predicate::str::contains("gate"));

    bd(&dir)
        .args(["type", "define", "incident"])
        .assert()
        .success();
    bd(&dir)
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("incident"));

    bd(&dir)
        .args(["create", "Sev1", "-t", "incident"])
        .assert()
        .success();
}

#[test]
fn decision_stop_check_exit_codes() {
    // Scenario: no pending agent decision -> exit 1 with guidance; after
    // creating one, a second stop-check allows the yield and names the
    // decision.
    let dir = init_workspace();

    bd(&dir)
        .env("BD_ACTOR", "alice")
        .args(["decision", "stop-check"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("create a decision"));

    let output = bd(&dir)
        .env("BD_ACTOR", "alice")
        .args([
            "decision",
            "create",
            "--prompt",
            "Proceed with refactor?",
            "--option",
            "option-a:a:Proceed",
            "--option",
            "option-b:b:Stop",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let decision_id = String::from_utf8(output.stdout).unwrap().trim().to_owned();

    bd(&dir)
        .env("BD_ACTOR", "alice")
        .args(["decision", "stop-check"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains(&decision_id));

    // Scoping: bob's stop-check does not see alice's decision.
    bd(&dir)
        .env("BD_ACTOR", "bob")
        .args(["decision", "stop-check"])
        .assert()
        .code(1);
}

#[test]
fn decision_respond_closes_gate() {
    let dir = init_workspace();
    let output = bd(&dir)
        .args([
            "decision",
            "create",
            "--prompt",
            "Ship?",
            "--option",
            "option-a:a:Ship",
        ])
        .output()
        .unwrap();
    let id = String::from_utf8(output.stdout).unwrap().trim().to_owned();

    bd(&dir)
        .args(["decision", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id));

    bd(&dir)
        .args(["decision", "respond", &id, "a", "--text", "go with A"])
        .assert()
        .success();

    // Responded: the gate bead is closed and the decision leaves the
    // pending list.
    let show = bd(&dir).args(["show", &id, "--json"]).output().unwrap();
    let issue: Value = serde_json::from_slice(&show.stdout).unwrap();
    assert_eq!(issue["status"], "closed");

    bd(&dir)
        .args(["decision", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending decisions"));

    // Watch returns the stored response immediately (race guard).
    bd(&dir)
        .args(["decision", "watch", &id, "--timeout", "5s"])
        .assert()
        .success()
        .stdout(predicate::str::contains("option-a"))
        .stdout(predicate::str::contains("go with A"));

    // Responding twice fails.
    bd(&dir)
        .args(["decision", "respond", &id, "a"])
        .assert()
        .failure();
}

#[test]
fn formula_import_and_show() {
    let dir = init_workspace();
    let path = dir.path().join("release.formula.toml");
    std::fs::write(
        &path,
        r#"
formula = "release"
description = "Cut a release"

[[steps]]
id = "tag"
title = "Tag the build"
"#,
    )
    .unwrap();

    bd(&dir)
        .args(["formula", "import", path.to_str().unwrap()])
        .assert()
        .success();

    bd(&dir)
        .args(["formula", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("release"));

    bd(&dir)
        .args(["formula", "show", "release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tag the build"));

    // Stored formulas are plain beads of type formula.
    bd(&dir)
        .args(["list", "--type", "formula"])
        .assert()
        .success()
        .stdout(predicate::str::contains("release"));
}

#[test]
fn config_get_set_list() {
    let dir = init_workspace();
    bd(&dir)
        .args(["config", "set", "sync.branch", "beads-sync"])
        .assert()
        .success();
    bd(&dir)
        .args(["config", "get", "sync.branch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("beads-sync"));
    bd(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("issue_prefix"));
}

#[test]
fn json_error_envelope() {
    let dir = init_workspace();
    bd(&dir)
        .args(["show", "proj-nope", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""));
}
