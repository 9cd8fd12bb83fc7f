use anyhow::{anyhow, Result};
use log::debug;
use ndarray::{Array1, Array2};
use xgb::{
    parameters::{
        learning::{LearningTaskParametersBuilder, Objective},
        tree::{TreeBoosterParametersBuilder, TreeMethod},
        BoosterParametersBuilder, BoosterType,
    },
    Booster, DMatrix,
};

use crate::models::classifier_trait::{not_fitted, threshold, ClassifierModel};

/// Histogram gradient-boosted trees on the native libxgboost backend.
pub struct XGBoostClassifier {
    booster: Option<Booster>,
    n_estimators: u32,
    learning_rate: f32,
    max_depth: u32,
    subsample: f32,
    colsample_bytree: f32,
    seed: u64,
}

impl XGBoostClassifier {
    pub fn new(
        n_estimators: u32,
        learning_rate: f32,
        max_depth: u32,
        subsample: f32,
        colsample_bytree: f32,
        seed: u64,
    ) -> Self {
        XGBoostClassifier {
            booster: None,
            n_estimators,
            learning_rate,
            max_depth,
            subsample,
            colsample_bytree,
            seed,
        }
    }

    fn dmatrix(x: &Array2<f64>) -> Result<DMatrix> {
        // row-major f32 buffer
        let data: Vec<f32> = x.iter().map(|&v| v as f32).collect();
        debug!("Creating DMatrix from dense data: rows={}, cols={}", x.nrows(), x.ncols());
        DMatrix::from_dense(&data, x.nrows()).map_err(|e| anyhow!("DMatrix creation failed: {}", e))
    }
}

impl ClassifierModel for XGBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let mut dmat = Self::dmatrix(x)?;
        let labels: Vec<f32> = y.iter().map(|&l| l as f32).collect();
        dmat.set_labels(&labels)
            .map_err(|e| anyhow!("failed to set labels: {}", e))?;

        let learning_params = LearningTaskParametersBuilder::default()
            .objective(Objective::BinaryLogistic)
            .build()
            .map_err(|e| anyhow!("invalid learning parameters: {}", e))?;

        let tree_params = TreeBoosterParametersBuilder::default()
            .tree_method(TreeMethod::Hist)
            .max_depth(self.max_depth)
            .eta(self.learning_rate)
            .subsample(self.subsample)
            .colsample_bytree(self.colsample_bytree)
            .build()
            .map_err(|e| anyhow!("invalid tree parameters: {}", e))?;

        let booster_params = BoosterParametersBuilder::default()
            .booster_type(BoosterType::Tree(tree_params))
            .learning_params(learning_params)
            .verbose(false)
            .build()
            .map_err(|e| anyhow!("invalid booster parameters: {}", e))?;

        // Explicit update loop; the crate's `train` helper skips updates in
        // some published releases.
        let mut bst = Booster::new_with_cached_dmats(&booster_params, &[&dmat])
            .map_err(|e| anyhow!("failed to create Booster: {}", e))?;
        bst.set_param("seed", &self.seed.to_string())
            .map_err(|e| anyhow!("failed to set seed: {}", e))?;
        for i in 0..self.n_estimators as i32 {
            bst.update(&dmat, i)
                .map_err(|e| anyhow!("Booster.update failed at round {}: {}", i, e))?;
        }

        self.booster = Some(bst);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(threshold(&self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let bst = self.booster.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let dmat = Self::dmatrix(x)?;
        let preds = bst
            .predict(&dmat)
            .map_err(|e| anyhow!("xgboost prediction failed: {}", e))?;
        debug!(
            "[xgb.predict_proba] first {} preds = {:?}",
            preds.len().min(10),
            &preds[..preds.len().min(10)]
        );
        Ok(preds.into_iter().map(f64::from).collect())
    }

    fn name(&self) -> &str {
        "xgboost_hist"
    }
}
