//! Binary classification metrics against the held-out labels.
//!
//! Positive class is label `1`. Every metric either returns a value in
//! [0, 1] or a `BenchError::UndefinedMetric` when its denominator is zero;
//! callers record the error and report NaN.
use linfa::metrics::ToConfusionMatrix;
use ndarray::Array1;
use serde::Serialize;

use crate::error::{BenchError, Result};

pub const ACCURACY: &str = "Accuracy";
pub const PRECISION: &str = "Precision";
pub const RECALL: &str = "Recall";
pub const F1_SCORE: &str = "F1-Score";
pub const ROC_AUC: &str = "ROC AUC";

/// Confusion matrix for binary classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Tally predictions against ground truth through linfa's confusion
    /// matrix, split by the true label.
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(BenchError::undefined(
                ACCURACY,
                format!("{} predictions for {} labels", y_pred.len(), y_true.len()),
            ));
        }

        let (mut on_positives, mut on_negatives) = (Vec::new(), Vec::new());
        for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
            if truth == 1 {
                on_positives.push(pred == 1);
            } else {
                on_negatives.push(pred == 1);
            }
        }

        let tp = agreements(true, &on_positives)?;
        let tn = agreements(false, &on_negatives)?;
        Ok(ConfusionMatrix {
            tp,
            tn,
            fp: on_negatives.len() - tn,
            fn_: on_positives.len() - tp,
        })
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// (TP + TN) / Total
    pub fn accuracy(&self) -> Result<f64> {
        ratio(ACCURACY, self.tp + self.tn, self.total(), "no samples")
    }

    /// TP / (TP + FP)
    pub fn precision(&self) -> Result<f64> {
        ratio(
            PRECISION,
            self.tp,
            self.tp + self.fp,
            "no positive predictions",
        )
    }

    /// TP / (TP + FN)
    pub fn recall(&self) -> Result<f64> {
        ratio(RECALL, self.tp, self.tp + self.fn_, "no positive labels")
    }

    /// 2TP / (2TP + FP + FN); zero when positives exist but none are hit.
    pub fn f1_score(&self) -> Result<f64> {
        ratio(
            F1_SCORE,
            2 * self.tp,
            2 * self.tp + self.fp + self.fn_,
            "no positive labels and no positive predictions",
        )
    }
}

/// Rows of `predicted` that equal `truth`, read off linfa's confusion matrix.
///
/// linfa takes its class set from the predicted labels in hash order, so only
/// the order-free accuracy is read. One agreeing pair per class is appended
/// so no row falls outside that set, and subtracted again afterwards.
fn agreements(truth: bool, predicted: &[bool]) -> Result<usize> {
    let ground_truth: Array1<bool> = std::iter::repeat(truth)
        .take(predicted.len())
        .chain([false, true])
        .collect();
    let predicted: Array1<bool> = predicted.iter().copied().chain([false, true]).collect();
    let cm = <Array1<bool> as ToConfusionMatrix<bool, _>>::confusion_matrix(&predicted, &ground_truth)
        .map_err(|e| BenchError::undefined(ACCURACY, e.to_string()))?;
    let agreeing = (cm.accuracy() * ground_truth.len() as f32).round() as usize;
    Ok(agreeing.saturating_sub(2))
}

fn ratio(metric: &'static str, num: usize, denom: usize, why: &str) -> Result<f64> {
    if denom == 0 {
        return Err(BenchError::undefined(metric, why));
    }
    Ok(num as f64 / denom as f64)
}

/// Area under the ROC curve via the Mann-Whitney statistic.
///
/// Tied scores receive their average rank, which matches the trapezoidal
/// area under the curve. Needs both classes and finite scores.
pub fn roc_auc(y_true: &[usize], scores: &[f64]) -> Result<f64> {
    assert_eq!(
        y_true.len(),
        scores.len(),
        "Scores and labels must have the same length"
    );
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(BenchError::undefined(ROC_AUC, "scores contain NaN or infinity"));
    }
    let n_pos = y_true.iter().filter(|&&l| l == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(BenchError::undefined(
            ROC_AUC,
            "only one class present in the labels",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group [start, end) shares the mean rank.
        let mean_rank = (start + end + 1) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| y_true[i] == 1).count();
        rank_sum_pos += mean_rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Points of the ROC curve, one per distinct score threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// ROC curve from descending thresholds, starting at (0, 0).
pub fn roc_curve(y_true: &[usize], scores: &[f64]) -> Result<RocCurve> {
    assert_eq!(
        y_true.len(),
        scores.len(),
        "Scores and labels must have the same length"
    );
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(BenchError::undefined(ROC_AUC, "scores contain NaN or infinity"));
    }
    let n_pos = y_true.iter().filter(|&&l| l == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(BenchError::undefined(
            ROC_AUC,
            "only one class present in the labels",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f64::INFINITY],
    };
    let (mut tp, mut fp) = (0usize, 0usize);
    for (pos, &i) in order.iter().enumerate() {
        if y_true[i] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_group = pos + 1 == order.len() || scores[order[pos + 1]] != scores[i];
        if last_of_group {
            curve.fpr.push(fp as f64 / n_neg as f64);
            curve.tpr.push(tp as f64 / n_pos as f64);
            curve.thresholds.push(scores[i]);
        }
    }
    Ok(curve)
}

/// Metric values for one model; NaN where undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricValues {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
}

impl MetricValues {
    pub fn nan() -> Self {
        MetricValues {
            accuracy: f64::NAN,
            precision: f64::NAN,
            recall: f64::NAN,
            f1: f64::NAN,
            roc_auc: f64::NAN,
        }
    }
}

/// Compute all five metrics. `scores` is `None` when the model has no
/// ranking output, in which case ROC AUC is left NaN without an issue; the
/// caller reports that case itself.
pub fn evaluate(
    y_true: &[usize],
    y_pred: &[usize],
    scores: Option<&[f64]>,
) -> (MetricValues, Vec<BenchError>) {
    let mut issues = Vec::new();
    let cm = ConfusionMatrix::from_predictions(y_true, y_pred);
    let mut value = |r: Result<f64>| match r {
        Ok(v) => v,
        Err(e) => {
            issues.push(e);
            f64::NAN
        }
    };

    let mut values = match cm {
        Ok(cm) => MetricValues {
            accuracy: value(cm.accuracy()),
            precision: value(cm.precision()),
            recall: value(cm.recall()),
            f1: value(cm.f1_score()),
            roc_auc: f64::NAN,
        },
        Err(e) => {
            value(Err(e));
            MetricValues::nan()
        }
    };
    if let Some(s) = scores {
        values.roc_auc = value(roc_auc(y_true, s));
    }
    (values, issues)
}
