//! Failure isolation and degenerate-partition behaviour of the runner.

use anyhow::{bail, Result};
use fractal_classifiers::data_handling::{split, synthetic_table, Partition, PartitionKind};
use fractal_classifiers::metrics;
use fractal_classifiers::models::classifier_trait::ClassifierModel;
use fractal_classifiers::models::pipeline::Pipeline;
use fractal_classifiers::registry::{Capabilities, ModelRegistry, PipelineSpec};
use fractal_classifiers::runner::{RowStatus, TrainEvalRunner};
use ndarray::{Array1, Array2, Axis};

enum Behaviour {
    FailFit,
    Panic,
    LabelsOnly,
}

struct Misbehaving(Behaviour);

impl ClassifierModel for Misbehaving {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<usize>) -> Result<()> {
        match self.0 {
            Behaviour::FailFit => bail!("solver diverged"),
            Behaviour::Panic => panic!("backend exploded"),
            Behaviour::LabelsOnly => Ok(()),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(Array1::from_shape_fn(x.nrows(), |i| i % 2))
    }
}

struct FakeSpec {
    name: &'static str,
    behaviour: fn() -> Behaviour,
    supports_probability: bool,
}

impl PipelineSpec for FakeSpec {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            needs_scaling: false,
            supports_probability: self.supports_probability,
        }
    }

    fn build(&self) -> Pipeline {
        Pipeline::new(self.name, false, Box::new(Misbehaving((self.behaviour)())))
    }
}

// ---------------------------------------------------------------------------
// Isolation
// ---------------------------------------------------------------------------

#[test]
fn failing_and_panicking_models_do_not_stop_the_run() {
    let _ = env_logger::builder().is_test(true).try_init();
    let table = synthetic_table(60, 11).unwrap();
    let s = split(&table, 11).unwrap();
    let registry = ModelRegistry::benchmark(11)
        .unwrap()
        .select(&["Logistic Regression"])
        .unwrap();

    let failing = FakeSpec {
        name: "Failing",
        behaviour: || Behaviour::FailFit,
        supports_probability: true,
    };
    let panicking = FakeSpec {
        name: "Panicking",
        behaviour: || Behaviour::Panic,
        supports_probability: true,
    };
    let real = &registry.specs()[0];
    let specs: Vec<&dyn PipelineSpec> = vec![&failing, real, &panicking];

    let rows = TrainEvalRunner::run(specs.iter().copied(), &s.train, &s.test);
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].model, "Failing");
    assert!(rows[0].values().iter().all(|v| v.is_nan()));
    assert!(matches!(&rows[0].status, RowStatus::Failed { reason } if reason.contains("solver diverged")));

    assert_eq!(rows[1].model, "Logistic Regression");
    assert_eq!(rows[1].status, RowStatus::Complete);

    assert!(matches!(&rows[2].status, RowStatus::Failed { reason } if reason.contains("backend exploded")));
}

#[test]
fn model_without_scores_gets_nan_auc_only() {
    let table = synthetic_table(40, 5).unwrap();
    let s = split(&table, 5).unwrap();
    let labels_only = FakeSpec {
        name: "Labels only",
        behaviour: || Behaviour::LabelsOnly,
        supports_probability: false,
    };

    let rows = TrainEvalRunner::run([&labels_only], &s.train, &s.test);
    let row = &rows[0];
    assert!(row.roc_auc.is_nan());
    assert!(!row.accuracy.is_nan());
    match &row.status {
        RowStatus::Degraded { issues } => {
            assert!(issues.iter().any(|i| i.contains(metrics::ROC_AUC)), "{:?}", issues)
        }
        other => panic!("expected degraded row, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Degenerate test partition
// ---------------------------------------------------------------------------

#[test]
fn single_class_test_partition_leaves_auc_undefined_for_every_model() {
    let _ = env_logger::builder().is_test(true).try_init();
    let table = synthetic_table(60, 21).unwrap();
    let s = split(&table, 21).unwrap();
    let negatives: Vec<usize> = (0..s.test.len()).filter(|&i| s.test.y[i] == 0).collect();
    let test = Partition {
        kind: PartitionKind::Test,
        indices: negatives.iter().map(|&i| s.test.indices[i]).collect(),
        x: s.test.x.select(Axis(0), &negatives),
        y: s.test.y.select(Axis(0), &negatives),
    };
    assert!(test.y.iter().all(|&l| l == 0));

    let registry = ModelRegistry::benchmark(21).unwrap();
    let rows = TrainEvalRunner::run(&registry, &s.train, &test);
    assert_eq!(rows.len(), registry.len());
    for row in &rows {
        assert!(row.roc_auc.is_nan(), "{} has AUC {}", row.model, row.roc_auc);
        assert!((0.0..=1.0).contains(&row.accuracy), "{}: {}", row.model, row.accuracy);
        // no positive labels in truth
        assert!(row.recall.is_nan(), "{}", row.model);
        match &row.status {
            RowStatus::Degraded { issues } => assert!(
                issues.iter().any(|i| i.contains(metrics::ROC_AUC)),
                "{}: {:?}",
                row.model,
                issues
            ),
            other => panic!("{} should be degraded, got {:?}", row.model, other),
        }
    }
}
