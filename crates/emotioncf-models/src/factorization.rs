//! Pieces shared by the two non-negative factorisation models.

use crate::utils::observed_range;
use emotioncf_core::{
    error::{CfError, Result},
    masking::MaskedMatrix,
    types::{is_present, ScoreMatrix},
};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rule choosing the number of latent factors from the matrix shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FactorHeuristic {
    /// `min(n_subjects, n_items)`
    #[default]
    MinDimension,
    /// A fixed factor count
    Fixed(usize),
}

impl FactorHeuristic {
    /// Factor count for a matrix of the given shape.
    pub fn n_factors(&self, n_subjects: usize, n_items: usize) -> usize {
        match *self {
            Self::MinDimension => n_subjects.min(n_items),
            Self::Fixed(n) => n,
        }
    }

    /// Resolves and validates the factor count for `matrix`.
    pub fn resolve(&self, matrix: &MaskedMatrix) -> Result<usize> {
        let (n_subjects, n_items) = matrix.shape();
        let n_factors = self.n_factors(n_subjects, n_items);
        crate::utils::validate_n_factors(n_factors, matrix)?;
        Ok(n_factors)
    }
}

impl From<usize> for FactorHeuristic {
    fn from(n: usize) -> Self {
        Self::Fixed(n)
    }
}

/// Fails if any observed value is negative.
pub fn ensure_non_negative(matrix: &MaskedMatrix) -> Result<()> {
    let negatives = matrix
        .masked_data()
        .iter()
        .filter(|v| is_present(**v) && **v < 0.0)
        .count();
    if negatives > 0 {
        return Err(CfError::invalid_parameter(
            "data",
            format!("non-negative factorisation requires non-negative data, found {negatives} negative values"),
        ));
    }
    Ok(())
}

/// Uniform factors scaled so that `user · item` starts near the observed mean.
///
/// Draws the user matrix then the item matrix, each in row-major order.
pub fn init_uniform<R: Rng>(
    rng: &mut R,
    n_subjects: usize,
    n_items: usize,
    n_factors: usize,
    observed_mean: f64,
) -> (ScoreMatrix, ScoreMatrix) {
    let scale = (observed_mean.max(0.0) / n_factors as f64).sqrt();
    let uniform = Uniform::new(0.0, 1.0);
    let mut draw = |rows: usize, cols: usize| {
        let values: Vec<f64> = (0..rows * cols).map(|_| uniform.sample(&mut *rng) * scale).collect();
        ScoreMatrix::from_row_slice(rows, cols, &values)
    };
    let user = draw(n_subjects, n_factors);
    let item = draw(n_factors, n_items);
    (user, item)
}

/// Half-normal factors with standard deviation `1 / n_factors`.
///
/// Draws the user matrix then the item matrix, each in row-major order.
pub fn init_half_normal<R: Rng>(
    rng: &mut R,
    n_subjects: usize,
    n_items: usize,
    n_factors: usize,
) -> Result<(ScoreMatrix, ScoreMatrix)> {
    let normal = Normal::new(0.0, 1.0 / n_factors as f64)
        .map_err(|e| CfError::invalid_parameter("n_factors", e.to_string()))?;
    let mut draw = |rows: usize, cols: usize| {
        let values: Vec<f64> = (0..rows * cols).map(|_| normal.sample(&mut *rng).abs()).collect();
        ScoreMatrix::from_row_slice(rows, cols, &values)
    };
    let user = draw(n_subjects, n_factors);
    let item = draw(n_factors, n_items);
    Ok((user, item))
}

/// Clamps predictions to the observed data range when `clip` is set.
pub fn finalize_predictions(mut predictions: ScoreMatrix, matrix: &MaskedMatrix, clip: bool) -> ScoreMatrix {
    if clip {
        if let Some((lo, hi)) = observed_range(matrix) {
            predictions.apply(|v| *v = v.clamp(lo, hi));
        }
    }
    predictions
}
