use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

/// Run-level settings. Model hyper-parameters are fixed by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub seed: u64,
    pub data_path: PathBuf,
    pub output_path: PathBuf,
    /// Write an HTML report here when set.
    pub html_report: Option<PathBuf>,
    /// Restrict the run to these registry names; empty means all.
    pub models: Vec<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            seed: 42,
            data_path: PathBuf::from("sample_data/fractal_features.csv"),
            output_path: PathBuf::from("results/ML_performance_metrics.csv"),
            html_report: None,
            models: Vec::new(),
        }
    }
}

/// Load a benchmark configuration from a JSON file.
pub fn load_bench_config<P: AsRef<Path>>(path: P) -> Result<BenchConfig> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: BenchConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

impl BenchConfig {
    /// Start from the config file when given, else defaults, then apply
    /// command line overrides.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_bench_config(path)?,
            None => BenchConfig::default(),
        };

        if let Some(data) = matches.get_one::<PathBuf>("data") {
            config.data_path = data.clone();
        }
        if let Some(output) = matches.get_one::<PathBuf>("output") {
            config.output_path = output.clone();
        }
        if let Some(seed) = matches.get_one::<u64>("seed") {
            config.seed = *seed;
        }
        if let Some(html) = matches.get_one::<PathBuf>("html") {
            config.html_report = Some(html.clone());
        }
        if let Some(models) = matches.get_many::<String>("model") {
            config.models = models.cloned().collect();
        }
        Ok(config)
    }
}
