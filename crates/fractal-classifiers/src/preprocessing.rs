//! Feature standardization used by the scaled pipelines.
//!
//! Provides a column-wise standard scaler (zero mean, unit population
//! variance). Constant columns keep a unit scale so they map to zero instead
//! of dividing by zero.

use ndarray::{Array1, Array2, Axis};

/// Standard scaler (per-column mean/std) fitted on a training matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Scaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Scaler {
    /// Columns with a smaller stddev are treated as constant.
    const MIN_STD: f64 = 1e-12;
}

/// Fit a `Scaler` where rows are samples and columns are features.
///
/// Returns `None` for a matrix without rows.
pub fn fit_scaler(x: &Array2<f64>) -> Option<Scaler> {
    let mean = x.mean_axis(Axis(0))?;
    let std = x.std_axis(Axis(0), 0.0).mapv(|s| {
        if s < Scaler::MIN_STD {
            1.0
        } else {
            s
        }
    });
    Some(Scaler { mean, std })
}

/// Transform all rows using the provided `Scaler`.
pub fn transform_all(x: &Array2<f64>, sc: &Scaler) -> Array2<f64> {
    (x - &sc.mean) / &sc.std
}

/// Fit a scaler and return the transformed matrix together with it.
pub fn fit_transform(x: &Array2<f64>) -> Option<(Scaler, Array2<f64>)> {
    let sc = fit_scaler(x)?;
    let transformed = transform_all(x, &sc);
    Some((sc, transformed))
}
