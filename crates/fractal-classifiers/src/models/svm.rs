use anyhow::{anyhow, Result};
use linfa::dataset::Pr;
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_svm::Svm;
use ndarray::{Array1, Array2};

use crate::config::Gamma;
use crate::models::classifier_trait::{not_fitted, threshold, ClassifierModel};

enum FittedSvm {
    /// Platt-scaled output: probability of the positive class.
    Probability(Svm<f64, Pr>),
    /// Hard labels only.
    Labels(Svm<f64, bool>),
}

/// RBF-kernel support vector classifier (linfa-svm, SMO solver).
pub struct SVMClassifier {
    model: Option<FittedSvm>,
    c: f64,
    gamma: Gamma,
    probability: bool,
}

impl SVMClassifier {
    pub fn new(c: f64, gamma: Gamma, probability: bool) -> Self {
        SVMClassifier {
            model: None,
            c,
            gamma,
            probability,
        }
    }

    /// Resolve gamma on the training matrix the way the common "scale" and
    /// "auto" conventions define it.
    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self.gamma {
            Gamma::Value(g) => g,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }
}

impl ClassifierModel for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        // Targets as bool: positive class (1) is `true`.
        let y = y.mapv(|l| l == 1);
        let dataset = Dataset::new(x.to_owned(), y);

        // linfa's gaussian kernel is exp(-||a - b||^2 / eps), so eps = 1 / gamma.
        let gamma = self.resolve_gamma(x);
        let eps = 1.0 / gamma;
        log::debug!("SVM fit: gamma={:.6} (kernel eps={:.6}), C={}", gamma, eps, self.c);

        let model = if self.probability {
            let fitted = Svm::<f64, Pr>::params()
                .pos_neg_weights(self.c, self.c)
                .gaussian_kernel(eps)
                .fit(&dataset)
                .map_err(|e| anyhow!("SVM fit failed: {}", e))?;
            FittedSvm::Probability(fitted)
        } else {
            let fitted = Svm::<f64, bool>::params()
                .pos_neg_weights(self.c, self.c)
                .gaussian_kernel(eps)
                .fit(&dataset)
                .map_err(|e| anyhow!("SVM fit failed: {}", e))?;
            FittedSvm::Labels(fitted)
        };
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        match self.model.as_ref().ok_or_else(|| not_fitted(self.name()))? {
            FittedSvm::Probability(_) => Ok(threshold(&self.predict_proba(x)?)),
            FittedSvm::Labels(model) => {
                let labels: Array1<bool> = model.predict(x);
                Ok(labels.mapv(usize::from))
            }
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self.model.as_ref().ok_or_else(|| not_fitted(self.name()))? {
            FittedSvm::Probability(model) => {
                let predictions: Array1<Pr> = model.predict(x);
                Ok(predictions.mapv(|p| f64::from(*p)))
            }
            FittedSvm::Labels(_) => Err(anyhow!(
                "SVM was fitted without probability output"
            )),
        }
    }

    fn name(&self) -> &str {
        "svm_rbf"
    }
}
