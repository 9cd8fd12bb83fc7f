//! Integration tests for benchmark configuration loading and the run entry.

use std::io::Write;
use std::path::PathBuf;

use fractal_classifiers::BenchError;
use fractal_cli::bench::config::{load_bench_config, BenchConfig};
use fractal_cli::bench::run::{is_fatal, list_models, run_benchmark, write_synthetic_dataset};

// ---------------------------------------------------------------------------
// BenchConfig defaults & parsing
// ---------------------------------------------------------------------------

#[test]
fn defaults_match_documented_values() {
    let cfg = BenchConfig::default();
    assert_eq!(cfg.seed, 42);
    assert_eq!(cfg.data_path, PathBuf::from("sample_data/fractal_features.csv"));
    assert_eq!(cfg.output_path, PathBuf::from("results/ML_performance_metrics.csv"));
    assert!(cfg.html_report.is_none());
    assert!(cfg.models.is_empty());
}

#[test]
fn partial_json_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"seed": 7, "models": ["Random Forest"]}}"#).unwrap();
    let cfg = load_bench_config(file.path()).unwrap();
    assert_eq!(cfg.seed, 7);
    assert_eq!(cfg.models, vec!["Random Forest".to_string()]);
    assert_eq!(cfg.output_path, BenchConfig::default().output_path);
}

#[test]
fn malformed_json_errors_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = load_bench_config(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config"));
}

// ---------------------------------------------------------------------------
// run_benchmark
// ---------------------------------------------------------------------------

#[test]
fn missing_input_is_reported_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BenchConfig {
        data_path: dir.path().join("nope.csv"),
        output_path: dir.path().join("out.csv"),
        ..BenchConfig::default()
    };
    let err = run_benchmark(&cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::MissingInput { .. })
    ));
    assert!(is_fatal(&err));
    assert!(!cfg.output_path.exists());
}

#[test]
fn per_model_errors_do_not_abort() {
    let training: anyhow::Error = BenchError::training("XGBoost", "boom").into();
    assert!(!is_fatal(&training.context("while scoring")));

    let io = anyhow::anyhow!("disk full");
    assert!(is_fatal(&io));
}

#[test]
fn restricted_run_writes_selected_rows() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    write_synthetic_dataset(&data, 40, 3).unwrap();

    let cfg = BenchConfig {
        seed: 3,
        data_path: data,
        output_path: dir.path().join("out").join("metrics.csv"),
        html_report: None,
        models: vec!["Random Forest".to_string(), "Gradient Boosting".to_string()],
    };
    let report = run_benchmark(&cfg).unwrap();
    let names: Vec<&str> = report.rows().iter().map(|r| r.model.as_str()).collect();
    assert_eq!(names, ["Random Forest", "Gradient Boosting"]);
    assert_eq!(report.seed, Some(3));
    assert!(cfg.output_path.exists());
}

#[test]
fn model_listing_has_six_entries() {
    let lines = list_models(42).unwrap();
    assert_eq!(lines.len(), 6);
    assert!(lines.iter().any(|l| l.contains("n_estimators=200")));
}
