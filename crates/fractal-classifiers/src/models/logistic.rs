use anyhow::{anyhow, Result};
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};

use crate::models::classifier_trait::{not_fitted, ClassifierModel};

/// L2-regularised logistic regression (linfa-logistic, L-BFGS solver).
pub struct LogisticRegressionClassifier {
    model: Option<FittedLogisticRegression<f64, usize>>,
    c: f64,
    max_iter: u64,
}

impl LogisticRegressionClassifier {
    /// `c` is the inverse regularisation strength, as in liblinear/lbfgs
    /// conventions; linfa takes its reciprocal as `alpha`.
    pub fn new(c: f64, max_iter: u64) -> Self {
        LogisticRegressionClassifier {
            model: None,
            c,
            max_iter,
        }
    }
}

impl ClassifierModel for LogisticRegressionClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let dataset = Dataset::new(x.to_owned(), y.to_owned());
        let model = LogisticRegression::default()
            .alpha(1.0 / self.c)
            .max_iterations(self.max_iter)
            .fit(&dataset)
            .map_err(|e| anyhow!("logistic regression fit failed: {}", e))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        Ok(model.predict(x))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        // Probability of the larger label seen during fit, i.e. class 1.
        Ok(model.predict_probabilities(x))
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}
