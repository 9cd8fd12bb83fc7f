use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use fractal_classifiers::data_handling::{split, synthetic_table};
use fractal_classifiers::io::{read_feature_csv, write_feature_csv};
use fractal_classifiers::registry::ModelRegistry;
use fractal_classifiers::report::{self, html::benchmark_report, Report};
use fractal_classifiers::runner::TrainEvalRunner;
use fractal_classifiers::BenchError;

use crate::bench::config::BenchConfig;

/// Load, split, train, score and export. Returns the report that was written.
///
/// Fatal errors surface as a [`BenchError`] inside the `anyhow` chain, so a
/// caller can downcast to tell a missing dataset from a write failure.
pub fn run_benchmark(config: &BenchConfig) -> Result<Report> {
    let start_time = Instant::now();

    if !config.data_path.is_file() {
        return Err(BenchError::MissingInput {
            path: config.data_path.clone(),
        }
        .into());
    }

    let registry = ModelRegistry::benchmark(config.seed)?;
    let registry = if config.models.is_empty() {
        registry
    } else {
        registry.select(&config.models)?
    };

    let table = read_feature_csv(&config.data_path)
        .with_context(|| format!("Failed to load {}", config.data_path.display()))?;
    table.log_input_data_summary();

    let split = split(&table, config.seed)?;
    for line in split.summary() {
        log::info!("{}", line);
    }

    let evaluations = TrainEvalRunner::run_detailed(&registry, &split.train, &split.test);
    let rows = evaluations.iter().map(|e| e.row.clone()).collect();
    let report = report::build(rows)
        .with_seed(config.seed)
        .with_partition_sizes(split.train.len(), split.validation.len(), split.test.len());

    let written = report::export(&report, &config.output_path)?;
    println!("{}", report);
    log::info!("Results saved to {}", written.display());

    if let Some(html_path) = &config.html_report {
        let config_json = serde_json::to_string_pretty(config)?;
        benchmark_report(&report, &evaluations, Some(&config_json))
            .save_to_file(html_path)
            .with_context(|| format!("Failed to write HTML report: {}", html_path.display()))?;
        log::info!("HTML report saved to {}", html_path.display());
    }

    log::info!("Benchmark completed in {:?}", start_time.elapsed());
    Ok(report)
}

/// Whether `err` must abort the process. Errors that carry no
/// [`BenchError`] in their chain are treated as fatal.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BenchError>())
        .map_or(true, BenchError::is_fatal)
}

/// One line per registered model.
pub fn list_models(seed: u64) -> Result<Vec<String>> {
    Ok(ModelRegistry::benchmark(seed)?
        .iter()
        .map(|spec| spec.to_string())
        .collect())
}

/// Write a balanced synthetic dataset in the input schema.
pub fn write_synthetic_dataset<P: AsRef<Path>>(path: P, per_class: usize, seed: u64) -> Result<()> {
    let table = synthetic_table(per_class, seed)?;
    write_feature_csv(&table, &path)?;
    log::info!(
        "Wrote {} synthetic rows to {}",
        table.nrows(),
        path.as_ref().display()
    );
    Ok(())
}
