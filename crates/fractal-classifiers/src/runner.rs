//! Uniform fit / predict / score loop over the registered pipelines.
//!
//! Every pipeline is built fresh, fitted on the training partition and scored
//! on the test partition. Failures, including panics inside a backend, are
//! confined to the row of the model that raised them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use log::{error, info, warn};
use ndarray::Array1;
use serde::Serialize;

use crate::data_handling::Partition;
use crate::error::BenchError;
use crate::metrics::{self, MetricValues, RocCurve};
use crate::models::pipeline::Pipeline;
use crate::registry::PipelineSpec;

/// How complete a row's metrics are.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowStatus {
    Complete,
    /// Some metrics are NaN; each issue names why.
    Degraded { issues: Vec<String> },
    /// Fit or predict failed; every metric is NaN.
    Failed { reason: String },
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Complete => write!(f, "ok"),
            RowStatus::Degraded { issues } => write!(f, "degraded ({})", issues.join("; ")),
            RowStatus::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "F1-Score")]
    pub f1: f64,
    #[serde(rename = "ROC AUC")]
    pub roc_auc: f64,
    #[serde(skip)]
    pub status: RowStatus,
}

impl MetricRow {
    pub fn from_values(model: impl Into<String>, values: MetricValues, status: RowStatus) -> Self {
        MetricRow {
            model: model.into(),
            accuracy: values.accuracy,
            precision: values.precision,
            recall: values.recall,
            f1: values.f1,
            roc_auc: values.roc_auc,
            status,
        }
    }

    pub fn failed(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::from_values(
            model,
            MetricValues::nan(),
            RowStatus::Failed {
                reason: reason.into(),
            },
        )
    }

    /// Value of a metric by its report column name.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            metrics::ACCURACY => Some(self.accuracy),
            metrics::PRECISION => Some(self.precision),
            metrics::RECALL => Some(self.recall),
            metrics::F1_SCORE => Some(self.f1),
            metrics::ROC_AUC => Some(self.roc_auc),
            _ => None,
        }
    }

    pub fn values(&self) -> [f64; 5] {
        [self.accuracy, self.precision, self.recall, self.f1, self.roc_auc]
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RowStatus::Failed { .. })
    }
}

/// A row plus the artefacts the HTML report plots.
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub row: MetricRow,
    pub roc_curve: Option<RocCurve>,
    pub fit_time: Duration,
}

/// Stateless driver; all inputs are passed per call.
pub struct TrainEvalRunner;

struct Scored {
    predictions: Array1<usize>,
    scores: Result<Array1<f64>, BenchError>,
}

impl TrainEvalRunner {
    /// Fit and score every spec in order, one row per spec.
    pub fn run<'a, S, I>(specs: I, train: &Partition, test: &Partition) -> Vec<MetricRow>
    where
        S: PipelineSpec + ?Sized + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        Self::run_detailed(specs, train, test)
            .into_iter()
            .map(|evaluation| evaluation.row)
            .collect()
    }

    pub fn run_detailed<'a, S, I>(specs: I, train: &Partition, test: &Partition) -> Vec<ModelEvaluation>
    where
        S: PipelineSpec + ?Sized + 'a,
        I: IntoIterator<Item = &'a S>,
    {
        specs
            .into_iter()
            .map(|spec| Self::evaluate_one(spec, train, test))
            .collect()
    }

    fn evaluate_one<S: PipelineSpec + ?Sized>(
        spec: &S,
        train: &Partition,
        test: &Partition,
    ) -> ModelEvaluation {
        let name = spec.name().to_string();
        let supports_probability = spec.capabilities().supports_probability;
        info!("Training {} on {} rows", name, train.len());

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<Scored> {
            let mut pipeline: Pipeline = spec.build();
            pipeline.fit(&train.x, &train.y)?;
            let predictions = pipeline.predict(&test.x)?;
            let scores = Self::ranking_scores(&pipeline, &name, supports_probability, test);
            Ok(Scored {
                predictions,
                scores,
            })
        }));
        let fit_time = start.elapsed();

        let scored = match outcome {
            Ok(Ok(scored)) => scored,
            Ok(Err(e)) => return Self::failure(&name, BenchError::training(&name, e), fit_time),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                return Self::failure(
                    &name,
                    BenchError::training(&name, format!("panicked: {}", reason)),
                    fit_time,
                );
            }
        };
        info!("{} fitted and scored in {:.2?}", name, fit_time);

        let n_scores = scored.scores.as_ref().map_or(test.len(), |s| s.len());
        if scored.predictions.len() != test.len() || n_scores != test.len() {
            let err = BenchError::training(
                &name,
                format!(
                    "returned {} labels and {} scores for {} test rows",
                    scored.predictions.len(),
                    n_scores,
                    test.len()
                ),
            );
            return Self::failure(&name, err, fit_time);
        }

        let y_true = test.y.to_vec();
        let y_pred = scored.predictions.to_vec();
        let mut issues: Vec<BenchError> = Vec::new();
        let scores = match scored.scores {
            Ok(s) => Some(s.to_vec()),
            Err(e) => {
                issues.push(e);
                None
            }
        };

        let (values, metric_issues) = metrics::evaluate(&y_true, &y_pred, scores.as_deref());
        issues.extend(metric_issues);
        let roc_curve = scores
            .as_deref()
            .and_then(|s| metrics::roc_curve(&y_true, s).ok());

        let status = if issues.is_empty() {
            RowStatus::Complete
        } else {
            for issue in &issues {
                warn!("{}: {}", name, issue);
            }
            RowStatus::Degraded {
                issues: issues.iter().map(|e| e.to_string()).collect(),
            }
        };

        let row = MetricRow::from_values(name, values, status);
        info!(
            "{}: accuracy={:.4} precision={:.4} recall={:.4} f1={:.4} roc_auc={:.4}",
            row.model, row.accuracy, row.precision, row.recall, row.f1, row.roc_auc
        );
        ModelEvaluation {
            row,
            roc_curve,
            fit_time,
        }
    }

    /// Probabilities when the spec declares them, otherwise a decision
    /// function; a model with neither cannot be ranked.
    fn ranking_scores(
        pipeline: &Pipeline,
        name: &str,
        supports_probability: bool,
        test: &Partition,
    ) -> Result<Array1<f64>, BenchError> {
        let scores = if supports_probability {
            pipeline.predict_proba(&test.x)
        } else {
            pipeline.decision_function(&test.x)
        };
        scores.map_err(|e| {
            log::debug!("{} offers no ranking score: {}", name, e);
            BenchError::UnsupportedMetric {
                model: name.to_string(),
                metric: metrics::ROC_AUC,
            }
        })
    }

    fn failure(name: &str, err: BenchError, fit_time: Duration) -> ModelEvaluation {
        error!("{}", err);
        let reason = match &err {
            BenchError::TrainingFailure { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        ModelEvaluation {
            row: MetricRow::failed(name, reason),
            roc_curve: None,
            fit_time,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
