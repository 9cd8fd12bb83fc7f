use anyhow::{anyhow, Result};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, Array2};

use crate::models::classifier_trait::{not_fitted, threshold, ClassifierModel};

/// Boosting parameters passed straight to gbdt-rs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub iterations: usize,
    pub shrinkage: f32,
    pub max_depth: u32,
    pub data_sample_ratio: f64,
    pub feature_sample_ratio: f64,
}

/// Gradient Boosting Decision Tree (GBDT) classifier
///
/// Trained with the `LogLikelyhood` loss, which expects labels in `{-1, 1}`
/// and makes `GBDT::predict` return the positive-class probability.
pub struct GBDTClassifier {
    model: Option<GBDT>,
    params: BoostingParams,
}

impl GBDTClassifier {
    pub fn new(params: BoostingParams) -> Self {
        GBDTClassifier {
            model: None,
            params,
        }
    }

    fn to_data_vec(x: &Array2<f64>, y: Option<&Array1<usize>>) -> DataVec {
        let mut data = DataVec::with_capacity(x.nrows());
        for (i, row) in x.rows().into_iter().enumerate() {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let label = match y {
                Some(y) if y[i] == 1 => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            };
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        data
    }
}

impl ClassifierModel for GBDTClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(anyhow!("{} needs at least one training row", self.name()));
        }

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.params.shrinkage);
        config.set_max_depth(self.params.max_depth);
        config.set_iterations(self.params.iterations);
        config.set_data_sample_ratio(self.params.data_sample_ratio);
        config.set_feature_sample_ratio(self.params.feature_sample_ratio);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss("LogLikelyhood");

        let mut gbdt = GBDT::new(&config);
        let mut train_x = Self::to_data_vec(x, Some(y));
        gbdt.fit(&mut train_x);

        log::debug!(
            "{}: {} boosting rounds, shrinkage {}, depth {}",
            self.name(),
            self.params.iterations,
            self.params.shrinkage,
            self.params.max_depth
        );
        self.model = Some(gbdt);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(threshold(&self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let test_x = Self::to_data_vec(x, None);
        let predictions = model.predict(&test_x);
        Ok(predictions.into_iter().map(f64::from).collect())
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gbdt_classifier() {
        // Second feature alone decides the label.
        let x = Array2::from_shape_vec(
            (10, 5),
            vec![
                0.1, 1.0, 5.0, 0.2, -0.3, 0.4, -1.0, 5.0, 0.8, 0.1, 0.6, 1.0, 5.0, 1.2, 0.2, 0.9,
                -1.0, 5.0, 1.8, -0.1, 1.2, 1.0, 5.0, 2.4, 0.3, 1.5, -1.0, 5.0, 3.0, 0.0, 1.8, 1.0,
                5.0, 3.6, -0.2, 2.1, -1.0, 5.0, 4.2, 0.4, 2.4, 1.0, 5.0, 4.8, -0.1, 2.7, -1.0, 5.0,
                5.4, 0.2,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![1usize, 0, 1, 0, 1, 0, 1, 0, 1, 0]);

        let params = BoostingParams {
            iterations: 20,
            shrinkage: 0.3,
            max_depth: 3,
            data_sample_ratio: 1.0,
            feature_sample_ratio: 1.0,
        };
        let mut classifier = GBDTClassifier::new(params);
        classifier.fit(&x, &y).unwrap();

        let proba = classifier.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), y.len());
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(classifier.predict(&x).unwrap(), y);
    }

    #[test]
    fn unfitted_gbdt_errors() {
        let params = BoostingParams {
            iterations: 1,
            shrinkage: 0.1,
            max_depth: 1,
            data_sample_ratio: 1.0,
            feature_sample_ratio: 1.0,
        };
        let classifier = GBDTClassifier::new(params);
        assert_eq!(classifier.name(), "gradient_boosting");
        assert!(classifier.predict_proba(&Array2::zeros((1, 2))).is_err());
    }
}
