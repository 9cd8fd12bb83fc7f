use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised while loading data, declaring models, evaluating them or
/// writing the report.
///
/// Dataset, configuration and IO errors are fatal for a run. Training and
/// metric errors are recorded against a single model and the run continues.
#[derive(Debug)]
pub enum BenchError {
    /// The dataset file does not exist.
    MissingInput { path: PathBuf },
    /// Required columns are missing, a value is null or the label is not binary.
    Schema(String),
    /// A class has too few rows to appear in every partition.
    InsufficientData { label: usize, count: usize, reason: String },
    /// A registry entry is structurally invalid.
    Configuration { model: String, reason: String },
    /// A model could not be fit or could not predict.
    TrainingFailure { model: String, reason: String },
    /// A model exposes neither probabilities nor a ranking score.
    UnsupportedMetric { model: String, metric: &'static str },
    /// A metric has a zero denominator or needs both classes.
    UndefinedMetric { metric: &'static str, reason: String },
    /// The report could not be written.
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, BenchError>;

impl BenchError {
    pub fn schema(msg: impl Into<String>) -> Self {
        BenchError::Schema(msg.into())
    }

    pub fn configuration(model: impl Into<String>, reason: impl Into<String>) -> Self {
        BenchError::Configuration {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn training(model: impl Into<String>, reason: impl fmt::Display) -> Self {
        BenchError::TrainingFailure {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    pub fn undefined(metric: &'static str, reason: impl Into<String>) -> Self {
        BenchError::UndefinedMetric {
            metric,
            reason: reason.into(),
        }
    }

    /// Fatal errors abort the run; the others degrade a single report row.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BenchError::TrainingFailure { .. }
                | BenchError::UnsupportedMetric { .. }
                | BenchError::UndefinedMetric { .. }
        )
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BenchError::MissingInput { path } => {
                write!(f, "Input dataset not found: {}", path.display())
            }
            BenchError::Schema(msg) => write!(f, "Invalid dataset: {}", msg),
            BenchError::InsufficientData {
                label,
                count,
                reason,
            } => write!(
                f,
                "Cannot stratify class {} ({} rows): {}",
                label, count, reason
            ),
            BenchError::Configuration { model, reason } => {
                write!(f, "Invalid configuration for '{}': {}", model, reason)
            }
            BenchError::TrainingFailure { model, reason } => {
                write!(f, "Model '{}' failed: {}", model, reason)
            }
            BenchError::UnsupportedMetric { model, metric } => write!(
                f,
                "Model '{}' exposes no score usable for {}",
                model, metric
            ),
            BenchError::UndefinedMetric { metric, reason } => {
                write!(f, "{} is undefined: {}", metric, reason)
            }
            BenchError::Io { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl Error for BenchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BenchError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_follows_propagation_policy() {
        assert!(BenchError::MissingInput {
            path: PathBuf::from("x.csv")
        }
        .is_fatal());
        assert!(BenchError::schema("no label").is_fatal());
        assert!(BenchError::configuration("RF", "zero trees").is_fatal());
        assert!(!BenchError::training("RF", "boom").is_fatal());
        assert!(!BenchError::undefined("Precision", "no positive predictions").is_fatal());
        assert!(!BenchError::UnsupportedMetric {
            model: "SVM".to_string(),
            metric: "ROC AUC"
        }
        .is_fatal());
    }

    #[test]
    fn io_error_keeps_destination_and_source() {
        let err = BenchError::Io {
            path: PathBuf::from("/nope/report.csv"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/nope/report.csv"));
        assert!(err.source().is_some());
    }
}
