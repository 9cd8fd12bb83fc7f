use crate::config::ModelType;
use crate::models::classifier_trait::ClassifierModel;
#[cfg(not(feature = "xgboost"))]
use crate::models::hist_boosting::{HistBoostingParams, HistGradientBoostingClassifier};
use crate::models::knn::KNNClassifier;
use crate::models::logistic::LogisticRegressionClassifier;
use crate::models::random_forest::RandomForestClassifier;
use crate::models::svm::SVMClassifier;

/// Build a fresh, unfitted classifier for `model_type`.
///
/// Hyper-parameters are copied by value; `seed` feeds every stochastic
/// constructor.
pub fn build_model(model_type: &ModelType, seed: u64) -> Box<dyn ClassifierModel> {
    match *model_type {
        ModelType::LogisticRegression { c, max_iter } => {
            Box::new(LogisticRegressionClassifier::new(c, max_iter))
        }
        ModelType::SVM {
            c,
            gamma,
            probability,
        } => Box::new(SVMClassifier::new(c, gamma, probability)),
        ModelType::KNN {
            n_neighbors,
            weights,
        } => Box::new(KNNClassifier::new(n_neighbors, weights)),
        ModelType::RandomForest {
            n_estimators,
            max_depth,
            min_samples_split,
        } => Box::new(RandomForestClassifier::new(
            n_estimators,
            max_depth,
            min_samples_split,
            seed,
        )),
        ModelType::GradientBoosting {
            n_estimators,
            learning_rate,
            max_depth,
        } => Box::new(crate::models::gbdt::GBDTClassifier::new(
            crate::models::gbdt::BoostingParams {
                iterations: n_estimators,
                shrinkage: learning_rate,
                max_depth,
                data_sample_ratio: 1.0,
                feature_sample_ratio: 1.0,
            },
        )),
        #[cfg(feature = "xgboost")]
        ModelType::XGBoost {
            n_estimators,
            learning_rate,
            max_depth,
            subsample,
            colsample_bytree,
        } => Box::new(crate::models::xgboost::XGBoostClassifier::new(
            n_estimators,
            learning_rate,
            max_depth,
            subsample,
            colsample_bytree,
            seed,
        )),
        #[cfg(not(feature = "xgboost"))]
        ModelType::XGBoost {
            n_estimators,
            learning_rate,
            max_depth,
            subsample,
            colsample_bytree,
        } => Box::new(HistGradientBoostingClassifier::new(
            HistBoostingParams {
                n_estimators: n_estimators as usize,
                learning_rate: f64::from(learning_rate),
                max_depth: max_depth as usize,
                subsample: f64::from(subsample),
                colsample_bytree: f64::from(colsample_bytree),
            },
            seed,
        )),
    }
}
