//! CLI integration tests for marktask
//!
//! These tests run the binary against a temporary notes directory and check
//! both what it prints and what it leaves on disk.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the marktask binary, pointed at `root`
fn marktask_cmd(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("marktask"));
    cmd.arg("--root").arg(root).env_remove("MARKTASK_ROOT").env_remove("RUST_LOG");
    cmd
}

/// Create a notes directory with a couple of documents
fn setup_notes() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("inbox.md"),
        "# Inbox\n\n- [ ] Buy milk due:2024-01-10 priority:2\n- [/] Write report priority:1\nnot a task\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("projects")).unwrap();
    fs::write(
        dir.path().join("projects/garden.md"),
        "---\ntype: project\n---\n- [x] Order seeds completed:2024-01-02\n- [b] Plant tomatoes due:2024-03-01\n",
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "- [ ] Not indexed\n").unwrap();
    dir
}

fn read(dir: &TempDir, path: &str) -> String {
    fs::read_to_string(dir.path().join(path)).unwrap()
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_summary_counts_tasks() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 tasks in 2 documents"));
}

#[test]
fn test_summary_json_format() {
    let dir = setup_notes();

    let output = marktask_cmd(dir.path())
        .args(["--format", "json", "summary"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tasks"], 4);
    assert_eq!(json["documents"], 2);
}

#[test]
fn test_list_shows_tasks_with_locations() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"inbox\.md:3 +- \[ \] Buy milk due:2024-01-10 priority:2\n").unwrap())
        .stdout(predicate::str::is_match(r"inbox\.md:4 +- \[/\] Write report priority:1\n").unwrap())
        .stdout(predicate::str::is_match(r"projects/garden\.md:5  - \[b\] Plant tomatoes").unwrap())
        .stdout(predicate::str::contains("Not indexed").not());
}

#[test]
fn test_list_filters_by_status() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["list", "--status", "done", "--status", "blocked"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Order seeds"))
        .stdout(predicate::str::contains("Plant tomatoes"))
        .stdout(predicate::str::contains("Buy milk").not());
}

#[test]
fn test_list_filters_by_document_and_due() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["list", "--document", "inbox.md", "--due-before", "2024-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Buy milk"))
        .stdout(predicate::str::contains("Write report").not())
        .stdout(predicate::str::contains("Plant tomatoes").not());
}

#[test]
fn test_list_sorted_by_priority_json() {
    let dir = setup_notes();

    let output = marktask_cmd(dir.path())
        .args(["--format", "json", "list", "--sort", "priority"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tasks: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = tasks.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec!["Write report", "Buy milk", "Order seeds", "Plant tomatoes"]
    );
    assert_eq!(tasks[0]["id"], "inbox.md:4");
    assert_eq!(tasks[0]["status"], "doing");
}

#[test]
fn test_list_empty_root() {
    let dir = TempDir::new().unwrap();

    marktask_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found"));
}

#[test]
fn test_document_type_scopes_index() {
    let dir = setup_notes();
    fs::write(dir.path().join(".marktask.toml"), "document_type = \"project\"\n").unwrap();

    marktask_cmd(dir.path())
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 tasks in 1 documents"));
}

// =============================================================================
// Edit Tests
// =============================================================================

#[test]
fn test_add_appends_task() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["add", "inbox.md", "Call plumber", "--due", "2024-02-01", "--priority", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added to inbox.md"));

    assert!(read(&dir, "inbox.md").ends_with("not a task\n- [ ] Call plumber due:2024-02-01 priority:3\n"));
}

#[test]
fn test_add_at_beginning_skips_front_matter() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["add", "projects/garden.md", "Dig beds", "--beginning"])
        .assert()
        .success();

    let content = read(&dir, "projects/garden.md");
    assert!(content.starts_with("---\ntype: project\n---\n- [ ] Dig beds\n- [x] Order seeds"));
}

#[test]
fn test_add_at_line() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["add", "inbox.md", "Pay rent", "--line", "3"])
        .assert()
        .success();

    let lines: Vec<_> = read(&dir, "inbox.md").lines().map(str::to_string).collect();
    assert_eq!(lines[2], "- [ ] Pay rent");
    assert_eq!(lines[3], "- [ ] Buy milk due:2024-01-10 priority:2");
}

#[test]
fn test_add_with_recurrence() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["add", "inbox.md", "Water plants", "--every", "monday, thursday"])
        .assert()
        .success();

    assert!(read(&dir, "inbox.md").contains("- [ ] Water plants every:monday, thursday\n"));
}

#[test]
fn test_add_rejects_unknown_recurrence() {
    let dir = setup_notes();
    let before = read(&dir, "inbox.md");

    marktask_cmd(dir.path())
        .args(["add", "inbox.md", "Water plants", "--every", "fortnightly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecognized recurrence"));

    assert_eq!(read(&dir, "inbox.md"), before);
}

#[test]
fn test_add_to_missing_document_fails() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["add", "missing.md", "Anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.md"));

    assert!(!dir.path().join("missing.md").exists());
}

#[test]
fn test_set_done_records_completion() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["set", "inbox.md", "3", "done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("inbox.md:3"));

    let lines: Vec<_> = read(&dir, "inbox.md").lines().map(str::to_string).collect();
    assert!(lines[2].starts_with("- [x] Buy milk due:2024-01-10 priority:2 completed:"));
    assert_eq!(lines[3], "- [/] Write report priority:1");
}

#[test]
fn test_set_reopen_clears_completion() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["set", "projects/garden.md", "4", "todo"])
        .assert()
        .success();

    assert!(read(&dir, "projects/garden.md").contains("\n- [ ] Order seeds\n"));
}

#[test]
fn test_set_on_non_task_line_fails() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["set", "inbox.md", "5", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No task at inbox.md:5"));
}

#[test]
fn test_set_rejects_unknown_status() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["set", "inbox.md", "3", "finished"])
        .assert()
        .failure();
}

#[test]
fn test_remove_deletes_line() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["remove", "inbox.md", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed inbox.md:4"));

    assert_eq!(
        read(&dir, "inbox.md"),
        "# Inbox\n\n- [ ] Buy milk due:2024-01-10 priority:2\nnot a task\n"
    );

    marktask_cmd(dir.path())
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 tasks in 2 documents"));
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn test_verbose_flag_logs_to_stderr() {
    let dir = setup_notes();

    marktask_cmd(dir.path())
        .args(["--verbose", "summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 tasks"));
}

#[test]
fn test_root_from_environment() {
    let dir = setup_notes();

    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("marktask"))
        .env("MARKTASK_ROOT", dir.path())
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 tasks in 2 documents"));
}

#[test]
fn test_invalid_project_config_error() {
    let dir = setup_notes();
    fs::write(dir.path().join(".marktask.toml"), "debounce_ms = \"soon\"\n").unwrap();

    marktask_cmd(dir.path())
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
