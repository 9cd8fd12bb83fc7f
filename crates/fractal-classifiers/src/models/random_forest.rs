use anyhow::{anyhow, Result};
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{seq::index, Rng, SeedableRng};

use crate::models::classifier_trait::{not_fitted, threshold, ClassifierModel};

struct ForestMember {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

/// Bagged ensemble of Gini decision trees (linfa-trees).
///
/// Each tree sees a bootstrap sample of the rows and a random subset of
/// `max(1, floor(sqrt(n_features)))` columns. All sampling draws from an
/// `StdRng` seeded at construction, so two forests built with the same seed
/// are identical.
///
/// linfa-trees has no per-split feature sampling, so the column subset is
/// drawn once per tree rather than at every split (a random-subspace
/// forest). With four input features every tree splits on only two of
/// them, which makes the individual trees weaker than in a per-split
/// forest; the ensemble vote compensates.
pub struct RandomForestClassifier {
    members: Vec<ForestMember>,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    seed: u64,
}

impl RandomForestClassifier {
    pub fn new(
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        seed: u64,
    ) -> Self {
        RandomForestClassifier {
            members: Vec::new(),
            n_estimators,
            max_depth,
            min_samples_split,
            seed,
        }
    }

    fn features_per_tree(n_features: usize) -> usize {
        ((n_features as f64).sqrt().floor() as usize).clamp(1, n_features.max(1))
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(anyhow!("random forest needs a non-empty training matrix"));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let n_sub = Self::features_per_tree(n_features);
        let mut members = Vec::with_capacity(self.n_estimators);

        for i in 0..self.n_estimators {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let mut features = index::sample(&mut rng, n_features, n_sub).into_vec();
            features.sort_unstable();

            let records = x.select(Axis(0), &rows).select(Axis(1), &features);
            let targets = y.select(Axis(0), &rows);
            let dataset = Dataset::new(records, targets);

            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(self.max_depth)
                .min_weight_split(self.min_samples_split as f32)
                .min_weight_leaf(1.0)
                .fit(&dataset)
                .map_err(|e| anyhow!("tree {} failed to fit: {}", i, e))?;
            members.push(ForestMember { features, tree });
        }

        log::debug!(
            "Random forest fitted {} trees on {} rows x {} of {} features",
            members.len(),
            n_rows,
            n_sub,
            n_features
        );
        self.members = members;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(threshold(&self.predict_proba(x)?))
    }

    /// Fraction of trees voting for the positive class.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.members.is_empty() {
            return Err(not_fitted(self.name()));
        }
        let mut votes = Array1::<f64>::zeros(x.nrows());
        for member in &self.members {
            let records = x.select(Axis(1), &member.features);
            let predicted: Array1<usize> = member.tree.predict(&records);
            votes.zip_mut_with(&predicted, |v, &p| *v += p as f64);
        }
        Ok(votes / self.members.len() as f64)
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_fn((40, 4), |(r, c)| {
            let base = if r < 20 { 0.0 } else { 3.0 };
            base + ((r * 7 + c * 3) % 10) as f64 / 10.0
        });
        let y = Array1::from_shape_fn(40, |r| usize::from(r >= 20));
        (x, y)
    }

    #[test]
    fn test_random_forest_learns_blobs() {
        let (x, y) = blobs();
        let mut forest = RandomForestClassifier::new(25, None, 2, 42);
        forest.fit(&x, &y).unwrap();
        let proba = forest.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(forest.predict(&x).unwrap(), y);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = blobs();
        let mut a = RandomForestClassifier::new(10, Some(3), 2, 7);
        let mut b = RandomForestClassifier::new(10, Some(3), 2, 7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn sqrt_feature_rule() {
        assert_eq!(RandomForestClassifier::features_per_tree(4), 2);
        assert_eq!(RandomForestClassifier::features_per_tree(1), 1);
        assert_eq!(RandomForestClassifier::features_per_tree(10), 3);
    }
}
