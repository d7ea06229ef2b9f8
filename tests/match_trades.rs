//! E2E tests for the match and report commands

use std::process::Command;

/// Test that the match command prints disposals and reports the residual
#[test]
fn match_command_prints_disposals() {
    let unmatched = std::env::temp_dir().join("ukcgt_e2e_unmatched.csv");

    let output = Command::new("cargo")
        .args([
            "run",
            "--quiet",
            "--",
            "match",
            "--trades",
            "tests/data/trades.csv",
            "--unmatched",
        ])
        .arg(&unmatched)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);

    // the AAPL round trip matches; MSFT is left over
    assert!(stdout.contains("Disposing Stocks trade:"));
    assert!(stdout.contains("AAPL"));
    assert!(stdout.contains("798.40"));
    assert!(stdout.contains("1 disposals, 1 trades left unmatched"));

    let residual = std::fs::read_to_string(&unmatched).expect("unmatched file written");
    assert!(residual.contains("MSFT"));
    assert!(!residual.contains("AAPL"));
}

/// Test the report command JSON summary for a tax year
#[test]
fn report_command_json_summary() {
    let output = Command::new("cargo")
        .args([
            "run",
            "--quiet",
            "--",
            "report",
            "--trades",
            "tests/data/trades.csv",
            "--year",
            "2025",
            "--json",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("\"tax_year\": \"2024/25\""));
    assert!(stdout.contains("\"number_of_disposals\": 1"));
    assert!(stdout.contains("\"total_gains_losses\": \"798.40\""));
}

/// Selecting bonds must fail before any processing
#[test]
fn bonds_selection_is_rejected() {
    let output = Command::new("cargo")
        .args([
            "run",
            "--quiet",
            "--",
            "match",
            "--trades",
            "tests/data/trades.csv",
            "--instrument-types",
            "stocks,bonds",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not supported"));
}
