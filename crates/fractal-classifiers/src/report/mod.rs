//! Report assembly and export.
//!
//! [`build`] keeps rows in production order; [`export`] writes the CSV
//! comparison table. The HTML report is optional and lives in [`html`].

pub mod html;
pub mod plots;
pub mod report;

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};
use crate::metrics;
pub use report::Report;

/// Column order of the exported table.
pub const CSV_HEADER: [&str; 6] = [
    "Model",
    metrics::ACCURACY,
    metrics::PRECISION,
    metrics::RECALL,
    metrics::F1_SCORE,
    metrics::ROC_AUC,
];

/// Wrap metric rows into a report, preserving their order.
pub fn build(rows: Vec<crate::runner::MetricRow>) -> Report {
    Report::new(rows)
}

/// Write `report` as CSV to `destination`, creating parent directories.
///
/// Returns the path written. NaN metrics are written as `NaN`.
pub fn export(report: &Report, destination: impl AsRef<Path>) -> Result<PathBuf> {
    let path = destination.as_ref().to_path_buf();
    let io_err = |source: std::io::Error| BenchError::Io {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let file = File::create(&path).map_err(io_err)?;
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| io_err(e.into()))?;
    for row in report.rows() {
        let mut record = vec![row.model.clone()];
        record.extend(row.values().iter().map(|v| format_metric(*v)));
        writer.write_record(&record).map_err(|e| io_err(e.into()))?;
    }
    writer.flush().map_err(io_err)?;

    log::info!("Wrote {} rows to {}", report.rows().len(), path.display());
    Ok(path)
}

/// `NaN` for undefined values, shortest round-trip decimal otherwise.
pub fn format_metric(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}
