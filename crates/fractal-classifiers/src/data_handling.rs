//! Feature table, partitions and the stratified train/validation/test split.
//!
//! `FeatureTable` is loaded once and only borrowed afterwards. `split` carves
//! it into three disjoint `Partition`s using two seeded stratified splits so
//! each partition keeps the class balance of the full table.
use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{BenchError, Result};

/// Feature columns consumed by every model, in matrix column order.
pub const FEATURE_COLUMNS: [&str; 4] = ["FD_right", "FD_left", "age", "gender"];
/// Binary target column.
pub const LABEL_COLUMN: &str = "label";

/// Fraction of the table held out from training (validation + test).
pub const HOLDOUT_FRACTION: f64 = 0.30;
/// Fraction of the holdout that becomes the test partition.
pub const TEST_FRACTION_OF_HOLDOUT: f64 = 0.50;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    x: Array2<f64>,
    y: Array1<usize>,
    feature_names: Vec<String>,
    /// Levels of label-encoded categorical columns, keyed by column name.
    categorical_levels: BTreeMap<String, Vec<String>>,
}

impl FeatureTable {
    /// Build a table, rejecting nulls, non-binary labels and shape mismatches.
    pub fn new(x: Array2<f64>, y: Array1<usize>, feature_names: Vec<String>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(BenchError::schema(format!(
                "feature matrix has {} rows but label vector has {}",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != feature_names.len() {
            return Err(BenchError::schema(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                x.ncols()
            )));
        }
        if let Some(((row, col), _)) = x.indexed_iter().find(|&(_, v)| !v.is_finite()) {
            return Err(BenchError::schema(format!(
                "null or non-finite value in column '{}' at row {}",
                feature_names[col],
                row + 1
            )));
        }
        if let Some((row, label)) = y.iter().enumerate().find(|&(_, &l)| l > 1) {
            return Err(BenchError::schema(format!(
                "label must be 0 or 1, found {} at row {}",
                label,
                row + 1
            )));
        }

        Ok(FeatureTable {
            x,
            y,
            feature_names,
            categorical_levels: BTreeMap::new(),
        })
    }

    pub fn with_categorical_levels(mut self, column: &str, levels: Vec<String>) -> Self {
        self.categorical_levels.insert(column.to_string(), levels);
        self
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<usize> {
        &self.y
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn categorical_levels(&self, column: &str) -> Option<&[String]> {
        self.categorical_levels.get(column).map(|v| v.as_slice())
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    /// Row count per label, ordered by label.
    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        class_counts(self.y.iter().copied())
    }

    /// Copy the selected rows into a named partition.
    pub fn partition(&self, kind: PartitionKind, indices: Vec<usize>) -> Partition {
        Partition {
            kind,
            x: self.x.select(Axis(0), &indices),
            y: self.y.select(Axis(0), &indices),
            indices,
        }
    }

    pub fn log_input_data_summary(&self) {
        let counts = self.class_counts();
        log::info!(
            "Loaded {} rows x {} features ({}); label=1: {}, label=0: {}",
            self.nrows(),
            self.x.ncols(),
            self.feature_names.join(", "),
            counts.get(&1).copied().unwrap_or(0),
            counts.get(&0).copied().unwrap_or(0)
        );
        for (column, levels) in &self.categorical_levels {
            log::debug!("Column '{}' label-encoded with levels {:?}", column, levels);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartitionKind {
    Train,
    /// Carved out for parity with the reference benchmark; not consumed by
    /// fitting or scoring.
    Validation,
    Test,
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartitionKind::Train => "train",
            PartitionKind::Validation => "validation",
            PartitionKind::Test => "test",
        };
        f.write_str(name)
    }
}

/// A disjoint subset of the table with its own feature matrix and labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub kind: PartitionKind,
    /// Source-table row indices, ascending.
    pub indices: Vec<usize>,
    pub x: Array2<f64>,
    pub y: Array1<usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        class_counts(self.y.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Partition,
    pub validation: Partition,
    pub test: Partition,
}

impl Split {
    pub fn partitions(&self) -> [&Partition; 3] {
        [&self.train, &self.validation, &self.test]
    }

    /// One line per partition: name, size and class counts.
    pub fn summary(&self) -> Vec<String> {
        self.partitions()
            .iter()
            .map(|p| {
                let counts = p
                    .class_counts()
                    .iter()
                    .map(|(label, n)| format!("label={}: {}", label, n))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{:<10} {:>5} rows ({})", p.kind.to_string(), p.len(), counts)
            })
            .collect()
    }
}

fn class_counts(labels: impl Iterator<Item = usize>) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Split `table` into 70% train, 15% validation and 15% test, stratified on
/// the label.
///
/// The first stage holds out 30% of the rows, the second halves the holdout
/// into validation and test. Both stages draw from an `StdRng` seeded with
/// `seed`, so identical inputs always produce identical memberships.
pub fn split(table: &FeatureTable, seed: u64) -> Result<Split> {
    if table.is_empty() {
        return Err(BenchError::schema("cannot split an empty table"));
    }
    for (&label, &count) in table.class_counts().iter() {
        if count < 3 {
            return Err(BenchError::InsufficientData {
                label,
                count,
                reason: "need at least one row in each of train, validation and test"
                    .to_string(),
            });
        }
    }

    let labels = table.y().as_slice().ok_or_else(|| {
        BenchError::schema("label vector is not contiguous in memory")
    })?;
    let all: Vec<usize> = (0..table.nrows()).collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let (train_idx, holdout_idx) = stratified_split(labels, &all, HOLDOUT_FRACTION, &mut rng)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let (validation_idx, test_idx) =
        stratified_split(labels, &holdout_idx, TEST_FRACTION_OF_HOLDOUT, &mut rng)?;

    let split = Split {
        train: table.partition(PartitionKind::Train, train_idx),
        validation: table.partition(PartitionKind::Validation, validation_idx),
        test: table.partition(PartitionKind::Test, test_idx),
    };
    for line in split.summary() {
        log::debug!("{}", line);
    }
    Ok(split)
}

/// Stratified two-way split of `indices` (rows of `labels`).
///
/// `ceil(fraction * n)` rows go to the second (holdout) side. Per-class holdout
/// counts are apportioned by largest remainder, ties going to the smaller
/// label. Returns `(kept, holdout)`, each sorted ascending.
pub fn stratified_split<R: Rng>(
    labels: &[usize],
    indices: &[usize],
    fraction: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = indices.len();
    if n == 0 {
        return Err(BenchError::schema("cannot split an empty index set"));
    }
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(BenchError::schema(format!(
            "split fraction must be in (0, 1), got {}",
            fraction
        )));
    }

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &idx in indices {
        by_class.entry(labels[idx]).or_default().push(idx);
    }

    let n_holdout = ((fraction * n as f64).ceil() as usize).min(n - 1).max(1);

    // Largest-remainder apportionment of n_holdout across classes.
    let mut allocation: Vec<(usize, usize, f64)> = by_class
        .iter()
        .map(|(&label, members)| {
            let exact = n_holdout as f64 * members.len() as f64 / n as f64;
            (label, exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let mut remaining = n_holdout - allocation.iter().map(|a| a.1).sum::<usize>();
    let mut order: Vec<usize> = (0..allocation.len()).collect();
    order.sort_by(|&a, &b| {
        allocation[b]
            .2
            .partial_cmp(&allocation[a].2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(allocation[a].0.cmp(&allocation[b].0))
    });
    for &i in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        let capacity = by_class[&allocation[i].0].len();
        if allocation[i].1 < capacity {
            allocation[i].1 += 1;
            remaining -= 1;
        }
    }

    let mut kept = Vec::with_capacity(n - n_holdout);
    let mut holdout = Vec::with_capacity(n_holdout);
    for (label, take, _) in allocation {
        let mut members = by_class[&label].clone();
        let count = members.len();
        if take == 0 || take == count {
            return Err(BenchError::InsufficientData {
                label,
                count,
                reason: format!(
                    "a {:.0}% stratified split would leave one side without this class",
                    fraction * 100.0
                ),
            });
        }
        members.shuffle(rng);
        holdout.extend_from_slice(&members[..take]);
        kept.extend_from_slice(&members[take..]);
    }

    kept.sort_unstable();
    holdout.sort_unstable();
    Ok((kept, holdout))
}

/// Deterministic, class-separated dataset in the benchmark schema.
///
/// Label 1 rows have lower fractal dimensions and are slightly older on
/// average, so every model has signal to learn while the classes overlap.
pub fn synthetic_table(per_class: usize, seed: u64) -> Result<FeatureTable> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = per_class * 2;
    let mut data = Vec::with_capacity(n * FEATURE_COLUMNS.len());
    let mut labels = Vec::with_capacity(n);

    for i in 0..n {
        let label = i % 2;
        let shift = if label == 1 { -0.04 } else { 0.04 };
        let fd_right = 1.45 + shift + rng.gen_range(-0.06..0.06);
        let fd_left = 1.45 + shift + rng.gen_range(-0.06..0.06);
        let age = (if label == 1 { 38.0 } else { 33.0 }) + rng.gen_range(-12.0..12.0);
        let gender = if rng.gen_bool(0.6) { 1.0 } else { 0.0 };
        data.extend_from_slice(&[fd_right, fd_left, age, gender]);
        labels.push(label);
    }

    let x = Array2::from_shape_vec((n, FEATURE_COLUMNS.len()), data)
        .map_err(|e| BenchError::schema(e.to_string()))?;
    FeatureTable::new(
        x,
        Array1::from_vec(labels),
        FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(labels: &[usize]) -> FeatureTable {
        let n = labels.len();
        let x = Array2::from_shape_fn((n, 4), |(r, c)| (r * 4 + c) as f64);
        FeatureTable::new(
            x,
            Array1::from_vec(labels.to_vec()),
            FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_non_binary_labels_and_nan() {
        let x = Array2::from_elem((3, 4), 1.0);
        let y = Array1::from_vec(vec![0, 1, 2]);
        let names: Vec<String> = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert!(matches!(
            FeatureTable::new(x, y, names.clone()),
            Err(BenchError::Schema(_))
        ));

        let mut x = Array2::from_elem((2, 4), 1.0);
        x[(1, 2)] = f64::NAN;
        let err = FeatureTable::new(x, Array1::from_vec(vec![0, 1]), names).unwrap_err();
        assert!(err.to_string().contains("age"), "{}", err);
    }

    #[test]
    fn split_balanced_200_rows_is_140_30_30() {
        let labels: Vec<usize> = (0..200).map(|i| i % 2).collect();
        let split = split(&table(&labels), 42).unwrap();
        assert_eq!(split.train.len(), 140);
        assert_eq!(split.validation.len(), 30);
        assert_eq!(split.test.len(), 30);
        assert_eq!(split.train.class_counts()[&1], 70);
        assert_eq!(split.test.class_counts()[&0], 15);
    }

    #[test]
    fn partition_rows_match_source_rows() {
        let labels: Vec<usize> = (0..40).map(|i| (i % 4 == 0) as usize).collect();
        let t = table(&labels);
        let split = split(&t, 7).unwrap();
        for p in split.partitions() {
            for (pos, &src) in p.indices.iter().enumerate() {
                assert_eq!(p.x.row(pos), t.x().row(src));
                assert_eq!(p.y[pos], t.y()[src]);
            }
        }
    }

    #[test]
    fn split_rejects_tiny_class() {
        let mut labels = vec![0usize; 20];
        labels[3] = 1;
        labels[9] = 1;
        let err = split(&table(&labels), 42).unwrap_err();
        assert!(matches!(err, BenchError::InsufficientData { label: 1, count: 2, .. }));
    }

    #[test]
    fn split_rejects_empty_table() {
        let empty = FeatureTable::new(
            Array2::zeros((0, 4)),
            Array1::from_vec(vec![]),
            FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        )
        .unwrap();
        assert!(matches!(split(&empty, 1), Err(BenchError::Schema(_))));
    }

    #[test]
    fn synthetic_table_is_balanced_and_reproducible() {
        let a = synthetic_table(50, 3).unwrap();
        let b = synthetic_table(50, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nrows(), 100);
        assert_eq!(a.class_counts()[&0], 50);
        assert_eq!(a.class_counts()[&1], 50);
    }
}
