//! Type aliases and numerical constants shared across the toolkit.
//!
//! Every matrix in the toolkit is a dynamically sized nalgebra matrix of
//! `f64` scores. Missing values are encoded as `NaN` so that the masked view
//! keeps the same shape as the data it was derived from.

pub use nalgebra::{DMatrix, DVector};

/// A user-by-item score matrix (rows are subjects, columns are items).
pub type ScoreMatrix = DMatrix<f64>;

/// A boolean observation mask, `true` meaning observed.
pub type BoolMatrix = DMatrix<bool>;

/// Marker used for missing entries in masked data and undefined scores.
pub const MISSING: f64 = f64::NAN;

/// Returns `true` if the value is a real observation rather than the missing marker.
#[inline]
pub fn is_present(value: f64) -> bool {
    value.is_finite()
}

/// Numerical constants used throughout the fitting algorithms.
pub mod constants {
    /// Default convergence tolerance on the relative change of the training loss.
    pub const DEFAULT_TOLERANCE: f64 = 1e-3;

    /// Default iteration cap for the iterative factorisation models.
    pub const DEFAULT_MAX_ITERATIONS: usize = 5000;

    /// Guard added to denominators of multiplicative updates.
    pub const DEFAULT_EPSILON: f64 = 1e-6;

    /// Default learning rate for the SGD factorisation.
    pub const DEFAULT_LEARNING_RATE: f64 = 1e-2;

    /// Default neighbourhood size for KNN imputation.
    pub const DEFAULT_NEIGHBORS: usize = 10;

    /// Smallest denominator considered non-zero when averaging.
    pub const WEIGHT_EPSILON: f64 = 1e-12;
}

/// Shape of a matrix as `(rows, columns)`.
pub type Shape = (usize, usize);

/// Formats a shape the way error messages print it.
pub fn format_shape(shape: Shape) -> String {
    format!("({}, {})", shape.0, shape.1)
}
