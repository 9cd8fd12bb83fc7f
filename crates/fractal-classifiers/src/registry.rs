//! Declarations of the benchmarked pipelines.
//!
//! A [`ModelSpec`] is immutable: it names a model, its preprocessing, its
//! algorithm with fixed hyper-parameters and the seed handed to stochastic
//! constructors. Building a spec always yields a fresh, unfitted
//! [`Pipeline`].

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::config::{Gamma, KnnWeights, ModelType};
use crate::error::{BenchError, Result};
use crate::models::factory::build_model;
use crate::models::pipeline::Pipeline;

/// A preprocessing stage applied before the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Preprocessing {
    /// Zero mean, unit variance per column, fitted on the training rows.
    Standardize,
}

impl fmt::Display for Preprocessing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preprocessing::Standardize => write!(f, "standardize"),
        }
    }
}

/// Tags the runner consults instead of matching on concrete model types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub needs_scaling: bool,
    pub supports_probability: bool,
}

/// Anything the runner can turn into a pipeline.
pub trait PipelineSpec {
    fn name(&self) -> &str;
    fn capabilities(&self) -> Capabilities;
    fn build(&self) -> Pipeline;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: String,
    pub preprocessing: Vec<Preprocessing>,
    pub model_type: ModelType,
    pub seed: u64,
}

impl ModelSpec {
    pub fn new(
        name: impl Into<String>,
        preprocessing: Vec<Preprocessing>,
        model_type: ModelType,
        seed: u64,
    ) -> Self {
        ModelSpec {
            name: name.into(),
            preprocessing,
            model_type,
            seed,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BenchError::configuration(
                "<unnamed>",
                "model name must not be empty",
            ));
        }
        if self.preprocessing.len() > 1 {
            return Err(BenchError::configuration(
                &self.name,
                "at most one preprocessing stage is supported",
            ));
        }
        self.model_type.validate(&self.name)
    }
}

impl PipelineSpec for ModelSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            needs_scaling: self.preprocessing.contains(&Preprocessing::Standardize),
            supports_probability: self.model_type.supports_probability(),
        }
    }

    fn build(&self) -> Pipeline {
        Pipeline::new(
            self.name.clone(),
            self.capabilities().needs_scaling,
            build_model(&self.model_type, self.seed),
        )
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preprocessing = if self.preprocessing.is_empty() {
            "none".to_string()
        } else {
            self.preprocessing
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        };
        let caps = self.capabilities();
        write!(
            f,
            "{:<24} {:<12} {:<20} {} [scaling={}, proba={}]",
            self.name,
            preprocessing,
            self.model_type.algorithm(),
            self.model_type,
            caps.needs_scaling,
            caps.supports_probability
        )
    }
}

/// Ordered, validated collection of model declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRegistry {
    specs: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// Validate every spec and reject duplicate names.
    pub fn new(specs: Vec<ModelSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &specs {
            spec.validate()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(BenchError::configuration(
                    &spec.name,
                    "duplicate model name",
                ));
            }
        }
        Ok(ModelRegistry { specs })
    }

    /// The six benchmarked models, in report order, checked like any other
    /// registry.
    pub fn benchmark(seed: u64) -> Result<Self> {
        let standardize = || vec![Preprocessing::Standardize];
        let specs = vec![
            ModelSpec::new(
                "Logistic Regression",
                standardize(),
                ModelType::LogisticRegression {
                    c: 1.0,
                    max_iter: 1000,
                },
                seed,
            ),
            ModelSpec::new(
                "Support Vector Machine",
                standardize(),
                ModelType::SVM {
                    c: 1.0,
                    gamma: Gamma::Scale,
                    probability: true,
                },
                seed,
            ),
            ModelSpec::new(
                "K-Nearest Neighbors",
                standardize(),
                ModelType::KNN {
                    n_neighbors: 5,
                    weights: KnnWeights::Distance,
                },
                seed,
            ),
            ModelSpec::new(
                "Random Forest",
                Vec::new(),
                ModelType::RandomForest {
                    n_estimators: 200,
                    max_depth: None,
                    min_samples_split: 2,
                },
                seed,
            ),
            ModelSpec::new(
                "Gradient Boosting",
                Vec::new(),
                ModelType::GradientBoosting {
                    n_estimators: 150,
                    learning_rate: 0.05,
                    max_depth: 3,
                },
                seed,
            ),
            ModelSpec::new(
                "XGBoost",
                Vec::new(),
                ModelType::XGBoost {
                    n_estimators: 200,
                    learning_rate: 0.05,
                    max_depth: 4,
                    subsample: 0.8,
                    colsample_bytree: 0.8,
                },
                seed,
            ),
        ];
        ModelRegistry::new(specs)
    }

    /// Keep only the named entries, preserving registration order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        for name in names {
            let name = name.as_ref();
            if !self.specs.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
                return Err(BenchError::configuration(name, "no such model in the registry"));
            }
        }
        let specs = self
            .specs
            .iter()
            .filter(|s| names.iter().any(|n| s.name.eq_ignore_ascii_case(n.as_ref())))
            .cloned()
            .collect();
        Ok(ModelRegistry { specs })
    }

    pub fn specs(&self) -> &[ModelSpec] {
        &self.specs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModelSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<'a> IntoIterator for &'a ModelRegistry {
    type Item = &'a ModelSpec;
    type IntoIter = std::slice::Iter<'a, ModelSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
