//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `fractal` binary end-to-end: argument
//! parsing, dataset generation, a restricted benchmark run and the failure
//! path for a missing dataset.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("fractal").unwrap()
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bench"))
        .stdout(predicate::str::contains("models"))
        .stdout(predicate::str::contains("synth"));
}

#[test]
fn models_lists_registry_in_order() {
    let assert = cmd().arg("models").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("Logistic Regression"));
    assert!(lines[5].starts_with("XGBoost"));
}

// ---------------------------------------------------------------------------
// Bench subcommand
// ---------------------------------------------------------------------------

#[test]
fn missing_dataset_fails_without_writing_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results").join("metrics.csv");
    cmd()
        .args(["bench", "-d"])
        .arg(dir.path().join("absent.csv"))
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Input dataset not found"));
    assert!(!out.exists());
}

#[test]
fn unknown_model_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    cmd()
        .args(["synth", "--per-class", "20", "-o"])
        .arg(&data)
        .assert()
        .success();
    cmd()
        .args(["bench", "--model", "Naive Bayes", "-d"])
        .arg(&data)
        .arg("-o")
        .arg(dir.path().join("out.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Naive Bayes"));
}

#[test]
fn synth_then_bench_writes_csv_and_html() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    let out = dir.path().join("results").join("metrics.csv");
    let html = dir.path().join("report.html");

    cmd()
        .args(["synth", "--per-class", "50", "--seed", "7", "-o"])
        .arg(&data)
        .assert()
        .success();

    cmd()
        .args(["bench", "--seed", "7", "-m", "Logistic Regression", "-m", "K-Nearest Neighbors", "-d"])
        .arg(&data)
        .arg("-o")
        .arg(&out)
        .arg("--html")
        .arg(&html)
        .assert()
        .success()
        .stdout(predicate::str::contains("Logistic Regression"))
        .stdout(predicate::str::contains("K-Nearest Neighbors"));

    let csv = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Model,Accuracy,Precision,Recall,F1-Score,ROC AUC");
    assert!(lines[1].starts_with("Logistic Regression,"));
    assert!(lines[2].starts_with("K-Nearest Neighbors,"));
    assert_eq!(lines.len(), 3);

    let report = std::fs::read_to_string(&html).unwrap();
    assert!(report.contains("ROC curves"));
}
