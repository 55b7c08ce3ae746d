//! End-to-end CLI tests using `assert_cmd`.
//!
//! These invoke the actual compiled binary and check exit codes and output.
//! None require a live LLM endpoint except tests marked #[ignore].

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn cmd() -> Command {
    Command::cargo_bin("translorc").unwrap()
}

#[test]
fn test_help_shows_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version_shows_semver() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("translorc"));
}

#[test]
fn test_run_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SOURCE"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--resume"))
        .stdout(predicate::str::contains("--source-lang"))
        .stdout(predicate::str::contains("--target-lang"));
}

#[test]
fn test_run_requires_source() {
    cmd().arg("run").assert().failure().stderr(predicate::str::contains("SOURCE"));
}

#[test]
fn test_run_rejects_invalid_language() {
    cmd()
        .args(["run", "/tmp/nonexistent.json", "--source-lang", "klingon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_init_creates_config() {
    let dir = tempdir().unwrap();
    cmd()
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration"));

    assert!(dir.path().join("translorc").join("config.toml").exists());
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    cmd().env("XDG_CONFIG_HOME", dir.path()).arg("init").assert().success();

    cmd()
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_status_on_empty_output_folder() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["status", "--output"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Project status"));
}

#[test]
fn test_stop_explains_lack_of_daemon() {
    cmd()
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ctrl-C"));
}

#[test]
fn test_export_requires_output() {
    cmd().arg("export").assert().success();
}

// Requires a live LLM endpoint matching the configured platform.
#[test]
#[ignore]
fn test_run_translates_flat_json_source() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.json");
    fs::write(&source, r#"[{"file_path": "a.txt", "src": "Hello"}]"#).unwrap();

    let output = dir.path().join("out");
    cmd()
        .args(["run", source.to_str().unwrap(), "--output", output.to_str().unwrap()])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .success();

    assert!(output.join("output").exists());
}
