use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Local};

use crate::error::{BenchError, Result};
use crate::metrics;
use crate::runner::{MetricRow, RowStatus};

/// Ordered metric rows plus run metadata.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Local>,
    pub seed: Option<u64>,
    /// train / validation / test sizes
    pub partition_sizes: Option<[usize; 3]>,
    rows: Vec<MetricRow>,
}

impl Report {
    pub fn new(rows: Vec<MetricRow>) -> Self {
        Report {
            title: "Binary classifier benchmark".to_string(),
            generated_at: Local::now(),
            seed: None,
            partition_sizes: None,
            rows,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_partition_sizes(mut self, train: usize, validation: usize, test: usize) -> Self {
        self.partition_sizes = Some([train, validation, test]);
        self
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    /// A copy ordered by `metric`, best first. NaN sorts last and ties keep
    /// production order.
    pub fn sorted_by(&self, metric: &str) -> Result<Report> {
        if !super::CSV_HEADER[1..].contains(&metric) {
            return Err(BenchError::configuration(
                "report",
                format!("unknown metric '{}'", metric),
            ));
        }
        let mut sorted = self.clone();
        sorted.rows.sort_by(|a, b| {
            let (a, b) = (a.metric(metric).unwrap_or(f64::NAN), b.metric(metric).unwrap_or(f64::NAN));
            match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => b.total_cmp(&a),
            }
        });
        Ok(sorted)
    }

    /// Models whose row is not complete.
    pub fn flagged(&self) -> impl Iterator<Item = &MetricRow> {
        self.rows
            .iter()
            .filter(|r| !matches!(r.status, RowStatus::Complete))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.model.len())
            .max()
            .unwrap_or(0)
            .max("Model".len());

        write!(f, "{:<width$}", "Model", width = width)?;
        for name in [
            metrics::ACCURACY,
            metrics::PRECISION,
            metrics::RECALL,
            metrics::F1_SCORE,
            metrics::ROC_AUC,
        ] {
            write!(f, "  {:>9}", name)?;
        }
        writeln!(f, "  Status")?;

        for row in &self.rows {
            write!(f, "{:<width$}", row.model, width = width)?;
            for value in row.values() {
                if value.is_nan() {
                    write!(f, "  {:>9}", "NaN")?;
                } else {
                    write!(f, "  {:>9.4}", value)?;
                }
            }
            writeln!(f, "  {}", row.status)?;
        }
        Ok(())
    }
}
