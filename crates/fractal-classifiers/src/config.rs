use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Kernel width for the RBF SVM.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// `1 / (n_features * var(X))`, computed on the training matrix.
    Scale,
    /// `1 / n_features`.
    Auto,
    Value(f64),
}

/// Neighbour vote weighting for k-NN.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KnnWeights {
    Uniform,
    /// Inverse distance; exact matches take the whole vote.
    Distance,
}

/// Supported algorithms and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    LogisticRegression {
        c: f64,
        max_iter: u64,
    },
    SVM {
        c: f64,
        gamma: Gamma,
        probability: bool,
    },
    KNN {
        n_neighbors: usize,
        weights: KnnWeights,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
    },
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f32,
        max_depth: u32,
    },
    XGBoost {
        n_estimators: u32,
        learning_rate: f32,
        max_depth: u32,
        subsample: f32,
        colsample_bytree: f32,
    },
}

impl ModelType {
    /// Short algorithm identifier, stable across releases.
    pub fn algorithm(&self) -> &'static str {
        match self {
            ModelType::LogisticRegression { .. } => "logistic_regression",
            ModelType::SVM { .. } => "svm_rbf",
            ModelType::KNN { .. } => "knn",
            ModelType::RandomForest { .. } => "random_forest",
            ModelType::GradientBoosting { .. } => "gradient_boosting",
            ModelType::XGBoost { .. } => "xgboost_hist",
        }
    }

    /// Whether the fitted model produces a positive-class probability.
    pub fn supports_probability(&self) -> bool {
        match self {
            ModelType::SVM { probability, .. } => *probability,
            _ => true,
        }
    }

    /// Reject structurally invalid hyper-parameters for the entry `model`.
    pub fn validate(&self, model: &str) -> Result<()> {
        let fail = |reason: String| Err(BenchError::configuration(model, reason));
        match self {
            ModelType::LogisticRegression { c, max_iter } => {
                if !(c.is_finite() && *c > 0.0) {
                    return fail(format!("C must be positive, got {}", c));
                }
                if *max_iter == 0 {
                    return fail("max_iter must be at least 1".to_string());
                }
            }
            ModelType::SVM { c, gamma, .. } => {
                if !(c.is_finite() && *c > 0.0) {
                    return fail(format!("C must be positive, got {}", c));
                }
                if let Gamma::Value(g) = gamma {
                    if !(g.is_finite() && *g > 0.0) {
                        return fail(format!("gamma must be positive, got {}", g));
                    }
                }
            }
            ModelType::KNN { n_neighbors, .. } => {
                if *n_neighbors == 0 {
                    return fail("n_neighbors must be at least 1".to_string());
                }
            }
            ModelType::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
            } => {
                if *n_estimators == 0 {
                    return fail("n_estimators must be at least 1".to_string());
                }
                if *max_depth == Some(0) {
                    return fail("max_depth must be at least 1 when set".to_string());
                }
                if *min_samples_split < 2 {
                    return fail(format!(
                        "min_samples_split must be at least 2, got {}",
                        min_samples_split
                    ));
                }
            }
            ModelType::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => {
                if *n_estimators == 0 {
                    return fail("n_estimators must be at least 1".to_string());
                }
                check_learning_rate(*learning_rate).or_else(fail)?;
                if *max_depth == 0 {
                    return fail("max_depth must be at least 1".to_string());
                }
            }
            ModelType::XGBoost {
                n_estimators,
                learning_rate,
                max_depth,
                subsample,
                colsample_bytree,
            } => {
                if *n_estimators == 0 {
                    return fail("n_estimators must be at least 1".to_string());
                }
                check_learning_rate(*learning_rate).or_else(fail)?;
                if *max_depth == 0 {
                    return fail("max_depth must be at least 1".to_string());
                }
                for (name, ratio) in [("subsample", subsample), ("colsample_bytree", colsample_bytree)] {
                    if !(ratio.is_finite() && *ratio > 0.0 && *ratio <= 1.0) {
                        return fail(format!("{} must be in (0, 1], got {}", name, ratio));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_learning_rate(learning_rate: f32) -> std::result::Result<(), String> {
    if learning_rate.is_finite() && learning_rate > 0.0 && learning_rate <= 1.0 {
        Ok(())
    } else {
        Err(format!("learning_rate must be in (0, 1], got {}", learning_rate))
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::LogisticRegression { c, max_iter } => {
                write!(f, "C={}, max_iter={}", c, max_iter)
            }
            ModelType::SVM {
                c,
                gamma,
                probability,
            } => {
                let gamma = match gamma {
                    Gamma::Scale => "scale".to_string(),
                    Gamma::Auto => "auto".to_string(),
                    Gamma::Value(g) => g.to_string(),
                };
                write!(f, "kernel=rbf, C={}, gamma={}, probability={}", c, gamma, probability)
            }
            ModelType::KNN {
                n_neighbors,
                weights,
            } => {
                let weights = match weights {
                    KnnWeights::Uniform => "uniform",
                    KnnWeights::Distance => "distance",
                };
                write!(f, "n_neighbors={}, weights={}", n_neighbors, weights)
            }
            ModelType::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
            } => {
                let depth = max_depth.map_or("None".to_string(), |d| d.to_string());
                write!(
                    f,
                    "n_estimators={}, max_depth={}, min_samples_split={}",
                    n_estimators, depth, min_samples_split
                )
            }
            ModelType::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
            } => write!(
                f,
                "n_estimators={}, learning_rate={}, max_depth={}",
                n_estimators, learning_rate, max_depth
            ),
            ModelType::XGBoost {
                n_estimators,
                learning_rate,
                max_depth,
                subsample,
                colsample_bytree,
            } => write!(
                f,
                "n_estimators={}, learning_rate={}, max_depth={}, subsample={}, colsample_bytree={}",
                n_estimators, learning_rate, max_depth, subsample, colsample_bytree
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_ids_are_distinct() {
        let registry = crate::registry::ModelRegistry::benchmark(0).unwrap();
        let ids: std::collections::HashSet<&str> = registry
            .iter()
            .map(|s| s.model_type.algorithm())
            .collect();
        assert_eq!(ids.len(), 6);
        assert!(ids.contains("xgboost_hist"));
    }

    #[test]
    fn validate_rejects_negative_c_and_empty_ensembles() {
        let lr = ModelType::LogisticRegression {
            c: -1.0,
            max_iter: 10,
        };
        assert!(matches!(
            lr.validate("lr"),
            Err(BenchError::Configuration { .. })
        ));

        let rf = ModelType::RandomForest {
            n_estimators: 0,
            max_depth: None,
            min_samples_split: 2,
        };
        assert!(rf.validate("rf").is_err());

        let xgb = ModelType::XGBoost {
            n_estimators: 10,
            learning_rate: 0.1,
            max_depth: 3,
            subsample: 1.5,
            colsample_bytree: 0.8,
        };
        let err = xgb.validate("xgb").unwrap_err();
        assert!(err.to_string().contains("subsample"));
    }

    #[test]
    fn svm_without_probability_has_no_probability_capability() {
        let svm = ModelType::SVM {
            c: 1.0,
            gamma: Gamma::Auto,
            probability: false,
        };
        assert!(!svm.supports_probability());
        let svm = ModelType::SVM {
            c: 1.0,
            gamma: Gamma::Scale,
            probability: true,
        };
        assert!(svm.supports_probability());
    }
}
