//! Accuracy metrics between ground truth and predictions.
//!
//! All metrics operate on paired slices that contain only cells where the
//! ground truth is present. An empty pairing produces `NaN`, never zero: a
//! partition without cells has no defined accuracy.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Accuracy metric reported in the results table.
///
/// Variants are declared in the order they appear in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Metric {
    /// Pearson correlation
    Corr,
    /// Mean absolute error
    Mae,
    /// Mean squared error
    Mse,
    /// Root mean squared error
    Rmse,
}

impl Metric {
    /// All metrics in table order.
    pub const ALL: [Metric; 4] = [Metric::Corr, Metric::Mae, Metric::Mse, Metric::Rmse];

    /// Short lower-case name used in the long-form table.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Corr => "corr",
            Metric::Mae => "mae",
            Metric::Mse => "mse",
            Metric::Rmse => "rmse",
        }
    }

    /// Scores `predicted` against `actual`.
    pub fn score(&self, actual: &[f64], predicted: &[f64]) -> f64 {
        debug_assert_eq!(actual.len(), predicted.len());
        match self {
            Metric::Corr => pearson(actual, predicted),
            Metric::Mae => mean_absolute_error(actual, predicted),
            Metric::Mse => mean_squared_error(actual, predicted),
            Metric::Rmse => mean_squared_error(actual, predicted).sqrt(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mean squared error; `NaN` for empty input.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    sum / actual.len() as f64
}

/// Mean absolute error; `NaN` for empty input.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    sum / actual.len() as f64
}

/// Pearson correlation.
///
/// `NaN` when fewer than two pairs exist or either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Arithmetic mean; `NaN` for empty input or if any value is `NaN`.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
