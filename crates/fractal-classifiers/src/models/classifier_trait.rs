use anyhow::{bail, Result};
use ndarray::{Array1, Array2};

/// Contract shared by every wrapped learning algorithm.
///
/// Labels follow the crate convention: `0` for the negative class and `1`
/// for the positive class. Implementations keep all fitted state inside
/// `self`, so a freshly constructed model never sees a previous fit.
pub trait ClassifierModel {
    /// Fit the model on a feature matrix and its binary labels.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()>;

    /// Predict hard class labels.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;

    /// Positive-class probability in [0, 1], when the algorithm provides one.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let _ = x;
        bail!("{} does not provide probability estimates", self.name())
    }

    /// A ranking score where larger means more likely positive (for example
    /// a signed distance to the decision boundary).
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let _ = x;
        bail!("{} does not provide a decision function", self.name())
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Turn positive-class probabilities into hard labels at 0.5.
pub(crate) fn threshold(proba: &Array1<f64>) -> Array1<usize> {
    proba.mapv(|p| usize::from(p >= 0.5))
}

/// Fail early when `predict` is called before `fit`.
pub(crate) fn not_fitted(name: &str) -> anyhow::Error {
    anyhow::anyhow!("{} has not been fitted", name)
}
