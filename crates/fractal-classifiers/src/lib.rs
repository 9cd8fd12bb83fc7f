//! fractal-classifiers: benchmark harness for binary classifiers on
//! fractal-dimension features.
//!
//! The crate loads a labeled feature table, splits it into stratified
//! train/validation/test partitions, fits a registry of model pipelines
//! (optional standardization + a linfa, gbdt or xgboost learner) and
//! collects accuracy, precision, recall, F1 and ROC AUC per model into a
//! report that can be written as CSV or HTML.
//!
//! The native libxgboost backend sits behind the `xgboost` feature; without
//! it the XGBoost entry is trained with gbdt-rs.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod registry;
pub mod report;
pub mod runner;

pub use error::{BenchError, Result};
