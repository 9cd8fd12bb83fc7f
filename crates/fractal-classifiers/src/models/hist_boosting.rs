use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};

use crate::models::classifier_trait::{not_fitted, threshold, ClassifierModel};

const MAX_BINS: usize = 256;
/// L2 penalty on leaf weights (`lambda`).
const REG_LAMBDA: f64 = 1.0;
/// Smallest hessian sum a child may hold (`min_child_weight`).
const MIN_CHILD_WEIGHT: f64 = 1.0;

/// Parameters of the histogram booster, named after their XGBoost counterparts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistBoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        bin: usize,
        /// Rows with a value `<= cut` go left.
        cut: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn margin_binned(&self, bins: &[Vec<usize>], row: usize) -> f64 {
        match self {
            Node::Leaf(w) => *w,
            Node::Split {
                feature,
                bin,
                left,
                right,
                ..
            } => {
                if bins[*feature][row] <= *bin {
                    left.margin_binned(bins, row)
                } else {
                    right.margin_binned(bins, row)
                }
            }
        }
    }

    fn margin(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            Node::Leaf(w) => *w,
            Node::Split {
                feature,
                cut,
                left,
                right,
                ..
            } => {
                if row[*feature] <= *cut {
                    left.margin(row)
                } else {
                    right.margin(row)
                }
            }
        }
    }
}

/// Gradient and hessian sums of one node.
#[derive(Debug, Clone, Copy, Default)]
struct GradStats {
    g: f64,
    h: f64,
}

impl GradStats {
    fn add(&mut self, g: f64, h: f64) {
        self.g += g;
        self.h += h;
    }

    fn score(&self) -> f64 {
        self.g * self.g / (self.h + REG_LAMBDA)
    }

    fn weight(&self) -> f64 {
        -self.g / (self.h + REG_LAMBDA)
    }
}

struct TreeBuilder<'a> {
    bins: &'a [Vec<usize>],
    cuts: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    max_depth: usize,
    learning_rate: f64,
}

impl TreeBuilder<'_> {
    fn stats(&self, rows: &[usize]) -> GradStats {
        let mut stats = GradStats::default();
        for &r in rows {
            stats.add(self.grad[r], self.hess[r]);
        }
        stats
    }

    fn build(&self, rows: Vec<usize>, depth: usize) -> Node {
        let total = self.stats(&rows);
        let leaf = Node::Leaf(self.learning_rate * total.weight());
        if depth >= self.max_depth || rows.len() < 2 {
            return leaf;
        }

        // (gain, feature, bin)
        let mut best: Option<(f64, usize, usize)> = None;
        for &feature in self.features {
            let n_bins = self.cuts[feature].len() + 1;
            if n_bins < 2 {
                continue;
            }
            let mut histogram = vec![GradStats::default(); n_bins];
            for &r in &rows {
                histogram[self.bins[feature][r]].add(self.grad[r], self.hess[r]);
            }

            let mut left = GradStats::default();
            for (bin, cell) in histogram.iter().enumerate().take(n_bins - 1) {
                left.add(cell.g, cell.h);
                let right = GradStats {
                    g: total.g - left.g,
                    h: total.h - left.h,
                };
                if left.h < MIN_CHILD_WEIGHT || right.h < MIN_CHILD_WEIGHT {
                    continue;
                }
                let gain = left.score() + right.score() - total.score();
                if gain > best.map_or(0.0, |b| b.0) {
                    best = Some((gain, feature, bin));
                }
            }
        }

        let Some((_, feature, bin)) = best else {
            return leaf;
        };
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| self.bins[feature][r] <= bin);
        Node::Split {
            feature,
            bin,
            cut: self.cuts[feature][bin],
            left: Box::new(self.build(left_rows, depth + 1)),
            right: Box::new(self.build(right_rows, depth + 1)),
        }
    }
}

/// Pure-Rust histogram gradient boosting with the logistic objective.
///
/// Features are bucketed into at most 256 quantile bins, trees grow depth-wise
/// on second-order gain with `lambda = 1` and `min_child_weight = 1`, and
/// every round draws its rows (`subsample`) and columns (`colsample_bytree`)
/// without replacement from an `StdRng` seeded at construction. It backs the
/// XGBoost entry when the native library is not compiled in.
pub struct HistGradientBoostingClassifier {
    params: HistBoostingParams,
    seed: u64,
    trees: Vec<Node>,
}

impl HistGradientBoostingClassifier {
    pub fn new(params: HistBoostingParams, seed: u64) -> Self {
        HistGradientBoostingClassifier {
            params,
            seed,
            trees: Vec::new(),
        }
    }

    /// Number of items drawn from `n` at `ratio`, never zero.
    fn sample_size(n: usize, ratio: f64) -> usize {
        ((ratio * n as f64).round() as usize).clamp(1, n)
    }

    /// Ascending upper bounds of all bins but the last.
    fn quantile_cuts(column: ArrayView1<f64>) -> Vec<f64> {
        let mut values: Vec<f64> = column.to_vec();
        values.sort_by(f64::total_cmp);
        values.dedup();
        if values.len() <= MAX_BINS {
            values.pop();
            return values;
        }
        let mut cuts: Vec<f64> = (1..MAX_BINS)
            .map(|q| values[q * values.len() / MAX_BINS])
            .collect();
        cuts.dedup();
        cuts
    }

    /// Index of the first cut `>= value`, or the last bin.
    fn bin_of(cuts: &[f64], value: f64) -> usize {
        cuts.partition_point(|&c| c < value)
    }

    fn margins(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted(self.name()));
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.margin(row)).sum::<f64>())
            .collect())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl ClassifierModel for HistGradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(anyhow!("histogram boosting needs a non-empty training matrix"));
        }
        if y.len() != n_rows {
            return Err(anyhow!("{} rows but {} labels", n_rows, y.len()));
        }

        let cuts: Vec<Vec<f64>> = x.columns().into_iter().map(Self::quantile_cuts).collect();
        let bins: Vec<Vec<usize>> = x
            .columns()
            .into_iter()
            .zip(&cuts)
            .map(|(col, cuts)| col.iter().map(|&v| Self::bin_of(cuts, v)).collect())
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let n_sub_rows = Self::sample_size(n_rows, self.params.subsample);
        let n_sub_features = Self::sample_size(n_features, self.params.colsample_bytree);
        // base_score 0.5
        let mut margin = vec![0.0; n_rows];
        let mut grad = vec![0.0; n_rows];
        let mut hess = vec![0.0; n_rows];
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            for r in 0..n_rows {
                let p = sigmoid(margin[r]);
                grad[r] = p - y[r] as f64;
                hess[r] = (p * (1.0 - p)).max(1e-16);
            }
            let mut rows = index::sample(&mut rng, n_rows, n_sub_rows).into_vec();
            rows.sort_unstable();
            let mut features = index::sample(&mut rng, n_features, n_sub_features).into_vec();
            features.sort_unstable();

            let tree = TreeBuilder {
                bins: &bins,
                cuts: &cuts,
                grad: &grad,
                hess: &hess,
                features: &features,
                max_depth: self.params.max_depth,
                learning_rate: self.params.learning_rate,
            }
            .build(rows, 0);
            for (r, m) in margin.iter_mut().enumerate() {
                *m += tree.margin_binned(&bins, r);
            }
            trees.push(tree);
        }

        log::debug!(
            "{}: {} rounds on {} of {} rows and {} of {} features per round",
            self.name(),
            trees.len(),
            n_sub_rows,
            n_rows,
            n_sub_features,
            n_features
        );
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(threshold(&self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.margins(x)?.mapv(sigmoid))
    }

    /// Raw log-odds margin.
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.margins(x)
    }

    fn name(&self) -> &str {
        "xgboost_hist"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn params(subsample: f64, colsample_bytree: f64) -> HistBoostingParams {
        HistBoostingParams {
            n_estimators: 30,
            learning_rate: 0.3,
            max_depth: 3,
            subsample,
            colsample_bytree,
        }
    }

    fn noisy_blobs() -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_fn((60, 4), |(r, c)| {
            let shift = if r % 2 == 0 { 0.0 } else { 1.5 };
            shift + ((r * 13 + c * 7) % 17) as f64 / 8.0
        });
        let y = Array1::from_shape_fn(60, |r| r % 2);
        (x, y)
    }

    #[test]
    fn learns_a_threshold() {
        let x = array![[0.1], [0.2], [0.3], [0.4], [0.6], [0.7], [0.8], [0.9]];
        let y = array![0usize, 0, 0, 0, 1, 1, 1, 1];
        let mut model = HistGradientBoostingClassifier::new(params(1.0, 1.0), 0);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&array![[0.05], [0.95]]).unwrap();
        assert!(proba[0] < 0.5 && proba[1] > 0.5);
    }

    #[test]
    fn subsampling_is_seeded() {
        let (x, y) = noisy_blobs();
        let fit = |seed| {
            let mut model = HistGradientBoostingClassifier::new(params(0.8, 0.8), seed);
            model.fit(&x, &y).unwrap();
            model.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(42), fit(42));
        assert_ne!(fit(42), fit(43));
    }

    #[test]
    fn full_sampling_ignores_the_seed() {
        let (x, y) = noisy_blobs();
        let fit = |seed| {
            let mut model = HistGradientBoostingClassifier::new(params(1.0, 1.0), seed);
            model.fit(&x, &y).unwrap();
            model.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(1), fit(2));
    }

    #[test]
    fn sample_sizes_and_bins() {
        assert_eq!(HistGradientBoostingClassifier::sample_size(140, 0.8), 112);
        assert_eq!(HistGradientBoostingClassifier::sample_size(4, 0.8), 3);
        assert_eq!(HistGradientBoostingClassifier::sample_size(1, 0.1), 1);

        let cuts = HistGradientBoostingClassifier::quantile_cuts(array![3.0, 1.0, 2.0, 2.0].view());
        assert_eq!(cuts, vec![1.0, 2.0]);
        assert_eq!(HistGradientBoostingClassifier::bin_of(&cuts, 0.5), 0);
        assert_eq!(HistGradientBoostingClassifier::bin_of(&cuts, 2.0), 1);
        assert_eq!(HistGradientBoostingClassifier::bin_of(&cuts, 9.0), 2);
    }

    #[test]
    fn unfitted_model_errors() {
        let model = HistGradientBoostingClassifier::new(params(0.8, 0.8), 0);
        assert!(model.predict_proba(&Array2::zeros((1, 2))).is_err());
    }
}
