use anyhow::{anyhow, Result};
use linfa_nn::distance::{Distance, L2Dist};
use linfa_nn::{CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array1, Array2};

use crate::config::KnnWeights;
use crate::models::classifier_trait::{not_fitted, threshold, ClassifierModel};

/// k-nearest-neighbour vote over a KD-tree index (linfa-nn).
///
/// Fitting only stores the training rows; the index is built per prediction
/// call since it borrows the stored matrix.
pub struct KNNClassifier {
    train: Option<(Array2<f64>, Array1<usize>)>,
    n_neighbors: usize,
    weights: KnnWeights,
}

impl KNNClassifier {
    pub fn new(n_neighbors: usize, weights: KnnWeights) -> Self {
        KNNClassifier {
            train: None,
            n_neighbors,
            weights,
        }
    }
}

impl ClassifierModel for KNNClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(anyhow!("k-NN needs at least one training row"));
        }
        self.train = Some((x.to_owned(), y.to_owned()));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(threshold(&self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (train_x, train_y) = self.train.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let k = self.n_neighbors.min(train_x.nrows());
        let index = CommonNearestNeighbour::KdTree
            .from_batch(train_x, L2Dist)
            .map_err(|e| anyhow!("failed to build KD-tree: {}", e))?;

        let mut proba = Vec::with_capacity(x.nrows());
        for row in x.rows() {
            let neighbours = index
                .k_nearest(row, k)
                .map_err(|e| anyhow!("nearest-neighbour query failed: {}", e))?;

            let votes: Vec<(f64, usize)> = neighbours
                .iter()
                .map(|(point, idx)| (L2Dist.distance(point.view(), row), train_y[*idx]))
                .collect();

            let exact: Vec<usize> = votes
                .iter()
                .filter(|(d, _)| *d == 0.0)
                .map(|&(_, label)| label)
                .collect();

            let p = match self.weights {
                // Exact matches take the whole vote under inverse-distance weights.
                KnnWeights::Distance if !exact.is_empty() => {
                    exact.iter().filter(|&&l| l == 1).count() as f64 / exact.len() as f64
                }
                KnnWeights::Distance => {
                    let total: f64 = votes.iter().map(|(d, _)| 1.0 / d).sum();
                    let positive: f64 = votes
                        .iter()
                        .filter(|(_, label)| *label == 1)
                        .map(|(d, _)| 1.0 / d)
                        .sum();
                    positive / total
                }
                KnnWeights::Uniform => {
                    votes.iter().filter(|(_, label)| *label == 1).count() as f64
                        / votes.len() as f64
                }
            };
            proba.push(p);
        }
        Ok(Array1::from_vec(proba))
    }

    fn name(&self) -> &str {
        "knn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_distance_weighted_vote() {
        let x = array![[0.0, 0.0], [0.1, 0.0], [0.0, 0.1], [5.0, 5.0], [5.1, 5.0], [5.0, 5.1]];
        let y = array![0usize, 0, 0, 1, 1, 1];
        let mut classifier = KNNClassifier::new(5, KnnWeights::Distance);
        classifier.fit(&x, &y).unwrap();

        let query = array![[0.05, 0.05], [4.9, 4.9]];
        let proba = classifier.predict_proba(&query).unwrap();
        assert!(proba[0] < 0.5 && proba[1] > 0.5);
        assert_eq!(classifier.predict(&query).unwrap(), array![0usize, 1]);
    }

    #[test]
    fn exact_match_takes_whole_vote() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![1usize, 0, 0];
        let mut classifier = KNNClassifier::new(3, KnnWeights::Distance);
        classifier.fit(&x, &y).unwrap();
        let proba = classifier.predict_proba(&array![[0.0]]).unwrap();
        assert_eq!(proba[0], 1.0);
    }

    #[test]
    fn k_larger_than_training_set_is_clamped() {
        let x = array![[0.0], [1.0]];
        let y = array![0usize, 1];
        let mut classifier = KNNClassifier::new(5, KnnWeights::Uniform);
        classifier.fit(&x, &y).unwrap();
        assert_eq!(classifier.predict_proba(&array![[0.4]]).unwrap()[0], 0.5);
    }
}
