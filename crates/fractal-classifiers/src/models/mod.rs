pub mod classifier_trait;
pub mod factory;
pub mod gbdt;
pub mod hist_boosting;
pub mod knn;
pub mod logistic;
pub mod pipeline;
pub mod random_forest;
pub mod svm;
#[cfg(feature = "xgboost")]
pub mod xgboost;
