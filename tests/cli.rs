//! Integration tests for the command-line interface
//!
//! Runs the built binary against temporary workspaces.

use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const MODEL: &str = "class Model:\n    def save(self):\n        return 1\n";

fn fuzzpatch() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fuzzpatch"));
    command.env("NO_COLOR", "1").env_remove("RUST_LOG");
    command
}

fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg/model.py"), MODEL).unwrap();
    dir
}

fn edit_text(before: &str, after: &str) -> String {
    format!(
        "<modifications>\n<file>pkg/model.py</file>\n<original>\n{before}\n</original>\n<patched>\n{after}\n</patched>\n</modifications>\n"
    )
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help_lists_subcommands() {
    let output = fuzzpatch().arg("--help").output().unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("search"));
    assert!(text.contains("apply"));
    assert!(text.contains("check"));
}

#[test]
fn test_search_class() {
    let dir = setup_workspace();
    let output = fuzzpatch()
        .args(["search", "class", "Model", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(stdout(&output).contains("Found 1 classes with name `Model`"));
}

#[test]
fn test_search_class_full_prints_body() {
    let dir = setup_workspace();
    let output = fuzzpatch()
        .args(["search", "class-full", "Model", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("1 class Model:"));
    assert!(text.contains("3         return 1"));

    let with_file = fuzzpatch()
        .args(["search", "class-full", "Model", "--file", "model.py", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!with_file.status.success());
}

#[test]
fn test_search_json_output() {
    let dir = setup_workspace();
    let output = fuzzpatch()
        .args(["search", "method", "save", "--class", "Model", "--json", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["matches"][0]["func_name"], "save");
    assert_eq!(value["matches"][0]["start"], 2);
}

#[test]
fn test_search_miss_exits_nonzero() {
    let dir = setup_workspace();
    let output = fuzzpatch()
        .args(["search", "class", "Missing", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Could not find class `Missing`"));
}

#[test]
fn test_apply_from_file() {
    let dir = setup_workspace();
    let edits = dir.path().join("edits.txt");
    fs::write(&edits, edit_text("        return 1", "        return 2")).unwrap();

    let output = fuzzpatch()
        .arg("apply")
        .arg(&edits)
        .arg("--root")
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(stdout(&output).contains("1 applied"));
    assert_eq!(
        fs::read_to_string(dir.path().join("pkg/model.py")).unwrap(),
        "class Model:\n    def save(self):\n        return 2\n"
    );
}

#[test]
fn test_apply_dry_run_from_stdin() {
    let dir = setup_workspace();
    let mut child = fuzzpatch()
        .args(["apply", "-", "--dry-run", "--diff", "--root"])
        .arg(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(edit_text("        return 1", "        return 2").as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("DRY RUN"));
    assert!(text.contains("Would apply"));
    assert!(text.contains("@@ -1,3 +1,3 @@"));
    assert!(text.contains(" class Model:\n"));
    assert!(text.contains("-        return 1\n"));
    assert!(text.contains("+        return 2\n"));
    assert_eq!(fs::read_to_string(dir.path().join("pkg/model.py")).unwrap(), MODEL);
}

#[test]
fn test_apply_failure_exits_nonzero() {
    let dir = setup_workspace();
    let edits = dir.path().join("edits.txt");
    fs::write(
        &edits,
        edit_text(
            "raise NotImplementedError(\"this module was never meant to be imported directly\")",
            "pass",
        ),
    )
    .unwrap();

    let output = fuzzpatch()
        .arg("apply")
        .arg(&edits)
        .arg("--root")
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(stdout(&output).contains("1 failed"));
    assert_eq!(fs::read_to_string(dir.path().join("pkg/model.py")).unwrap(), MODEL);
}

#[test]
fn test_check_reports_syntax_errors() {
    let dir = setup_workspace();
    let broken = dir.path().join("broken.py");
    fs::write(&broken, "def f(:\n    pass\n").unwrap();

    let ok = fuzzpatch()
        .arg("check")
        .arg(dir.path().join("pkg/model.py"))
        .output()
        .unwrap();
    assert!(ok.status.success());

    let failed = fuzzpatch().arg("check").arg(&broken).output().unwrap();
    assert!(!failed.status.success());
    assert!(String::from_utf8_lossy(&failed.stderr).contains("syntax errors"));
}

#[test]
fn test_config_flag_is_applied() {
    let dir = setup_workspace();
    let config = dir.path().join("fuzzpatch.toml");
    fs::write(&config, "[search]\nresult_show_limit = 0\n").unwrap();

    let output = fuzzpatch()
        .args(["--config"])
        .arg(&config)
        .args(["search", "class", "Model", "--root"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("result_show_limit"));
}
