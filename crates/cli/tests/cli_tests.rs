//! CLI integration tests

use std::process::{Command, Output};

fn sentinel(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sentinel"))
        .args(args)
        .env_remove("SENTINEL_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = sentinel(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Metric Sentinel"), "Should show app name");
    for command in ["ingest", "detect", "observe", "anomalies", "insights", "stats"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = sentinel(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("sentinel"), "Should show binary name");
}

/// Test global options
#[test]
fn test_global_options() {
    let output = sentinel(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("SENTINEL_API_URL"), "Should show env var");
    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test ingest command help
#[test]
fn test_ingest_help() {
    let output = sentinel(&["ingest", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Ingest help should succeed");
    assert!(stdout.contains("--timestamp"), "Should show timestamp option");
}

/// Test detect command help
#[test]
fn test_detect_help() {
    let output = sentinel(&["detect", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Detect help should succeed");
    assert!(
        stdout.contains("--sensitivity"),
        "Should show sensitivity option"
    );
}

/// Test anomalies list subcommand help
#[test]
fn test_anomalies_list_help() {
    let output = sentinel(&["anomalies", "list", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Anomalies list help should succeed");
    assert!(stdout.contains("--limit"), "Should show limit option");
    assert!(stdout.contains("--severity"), "Should show severity option");
    assert!(stdout.contains("--resolved"), "Should show resolved option");
    assert!(
        stdout.contains("--unresolved"),
        "Should show unresolved option"
    );
}

/// Test anomalies resolve subcommand help
#[test]
fn test_anomalies_resolve_help() {
    let output = sentinel(&["anomalies", "resolve", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Resolve help should succeed");
    assert!(stdout.contains("--note"), "Should show note option");
}

/// Test resolved and unresolved filters are exclusive
#[test]
fn test_resolved_filters_conflict() {
    let output = sentinel(&["anomalies", "list", "--resolved", "--unresolved"]);
    assert!(!output.status.success(), "Conflicting filters should fail");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = sentinel(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = sentinel(&["anomalies", "ack"]);

    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test non-numeric values are rejected before any request
#[test]
fn test_non_numeric_value() {
    let output = sentinel(&["ingest", "cpu", "lots"]);
    assert!(!output.status.success(), "Non-numeric value should fail");
}

/// Test unreachable agent reports an error
#[test]
fn test_unreachable_agent() {
    let output = sentinel(&["--api-url", "http://127.0.0.1:1", "stats"]);

    assert!(!output.status.success(), "Unreachable agent should fail");
    assert!(!output.stderr.is_empty(), "Should print an error");
}
