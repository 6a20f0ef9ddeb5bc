//! End-to-end binary tests

use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

fn memwatch() -> Command {
    let mut cmd = Command::cargo_bin("memwatch").expect("binary builds");
    cmd.timeout(Duration::from_secs(20));
    cmd
}

#[test]
fn help_lists_monitoring_options() {
    memwatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--interval"))
        .stdout(predicate::str::contains("--threshold"))
        .stdout(predicate::str::contains("--pid"))
        .stdout(predicate::str::contains("--capture-snapshot"))
        .stdout(predicate::str::contains("--chart"));
}

#[test]
fn unknown_flag_is_rejected() {
    memwatch().arg("--bogus").assert().failure();
}

#[test]
fn non_numeric_pid_is_rejected_before_start() {
    memwatch().args(["--pid", "abc"]).assert().failure();
}

#[test]
fn dead_pid_exits_nonzero_without_sampling() {
    memwatch()
        .args(["--pid", "4294967294", "--json"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("not found"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn pid_and_command_are_mutually_exclusive() {
    memwatch().args(["--pid", "1", "true"]).assert().failure();
}

#[test]
fn session_ends_when_child_exits() {
    // `true` exits immediately; the session must stop on its own and
    // surface the exit reason.
    memwatch()
        .args(["--json", "--interval", "50", "true"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Child process exited"));
}

#[test]
fn log_file_receives_session_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("memwatch.log");

    memwatch()
        .args([
            "--json",
            "--interval",
            "50",
            "--log-file",
            log_path.to_str().unwrap(),
            "sleep",
            "0.3",
        ])
        .assert()
        .success();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("[INFO] Memory monitoring started at"));
    assert!(contents.contains("Monitoring stopped after"));
}
