//! Basic CLI smoke tests against the compiled binary.

use std::process::Command;

fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_dayplan"))
        .args(args)
        .output()
        .expect("failed to execute CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn help_lists_top_level_commands() {
    let (stdout, _, code) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    for command in ["sync", "plan", "task", "config", "auth"] {
        assert!(stdout.contains(command), "missing command: {command}");
    }
}

#[test]
fn unknown_subcommand_fails() {
    let (_, stderr, code) = run_cli(&["frobnicate"]);
    assert_ne!(code, 0);
    assert!(!stderr.is_empty());
}

#[test]
fn plan_show_rejects_malformed_date() {
    let (_, stderr, code) = run_cli(&["plan", "show", "--date", "03/05/2025"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid date"));
}

#[test]
fn task_done_on_missing_id_fails() {
    let (_, stderr, code) = run_cli(&["--user", "cli-test", "task", "done", "no-such-id"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Task not found"));
}
