use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2};

use crate::models::classifier_trait::ClassifierModel;
use crate::preprocessing::{fit_transform, transform_all, Scaler};

/// Optional standardization stage followed by one classifier.
///
/// The scaler is fitted on the training matrix only and reused unchanged on
/// every later matrix.
pub struct Pipeline {
    name: String,
    standardize: bool,
    scaler: Option<Scaler>,
    model: Box<dyn ClassifierModel>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, standardize: bool, model: Box<dyn ClassifierModel>) -> Self {
        Pipeline {
            name: name.into(),
            standardize,
            scaler: None,
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        self.scaler.as_ref()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(anyhow!(
                "{} rows in the feature matrix but {} labels",
                x.nrows(),
                y.len()
            ));
        }
        if self.standardize {
            let (scaler, scaled) =
                fit_transform(x).ok_or_else(|| anyhow!("cannot standardize an empty matrix"))?;
            self.scaler = Some(scaler);
            self.model.fit(&scaled, y)
        } else {
            self.model.fit(x, y)
        }
    }

    fn prepare<'a>(&self, x: &'a Array2<f64>) -> Result<std::borrow::Cow<'a, Array2<f64>>> {
        if !self.standardize {
            return Ok(std::borrow::Cow::Borrowed(x));
        }
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| anyhow!("{} has not been fitted", self.name))?;
        Ok(std::borrow::Cow::Owned(transform_all(x, scaler)))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let x = self.prepare(x)?;
        self.model.predict(&x)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x = self.prepare(x)?;
        self.model.predict_proba(&x)
    }

    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x = self.prepare(x)?;
        self.model.decision_function(&x)
    }
}
