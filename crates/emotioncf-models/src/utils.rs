//! Helpers shared by the imputation algorithms.

use emotioncf_core::{
    error::{CfError, Result},
    masking::MaskedMatrix,
    types::{is_present, ScoreMatrix},
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seeded RNG, or one drawn from system entropy when no seed is set.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Mean of every observed cell.
///
/// Fails if the matrix has no observed cell at all, since no model can be
/// fit to it.
pub fn global_observed_mean(matrix: &MaskedMatrix) -> Result<f64> {
    let (sum, count) = matrix
        .masked_data()
        .iter()
        .filter(|v| is_present(**v))
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        return Err(CfError::invalid_parameter(
            "mask",
            "no observed cells are left to fit against",
        ));
    }
    Ok(sum / count as f64)
}

/// Per-column mean of observed cells; `None` for columns without observations.
pub fn observed_column_means(matrix: &MaskedMatrix) -> Vec<Option<f64>> {
    matrix
        .masked_data()
        .column_iter()
        .map(|column| {
            let (sum, count) = column
                .iter()
                .filter(|v| is_present(**v))
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            (count > 0).then(|| sum / count as f64)
        })
        .collect()
}

/// Column means with the global observed mean substituted for empty columns.
pub fn column_means_with_fallback(matrix: &MaskedMatrix) -> Result<Vec<f64>> {
    let global = global_observed_mean(matrix)?;
    Ok(observed_column_means(matrix)
        .into_iter()
        .map(|mean| mean.unwrap_or(global))
        .collect())
}

/// `(min, max)` over observed cells.
pub fn observed_range(matrix: &MaskedMatrix) -> Option<(f64, f64)> {
    matrix
        .masked_data()
        .iter()
        .copied()
        .filter(|v| is_present(*v))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Mean squared error of `reconstruction` over the cells with weight 1.
pub fn masked_mse(target: &ScoreMatrix, reconstruction: &ScoreMatrix, weights: &ScoreMatrix) -> f64 {
    let n_observed: f64 = weights.sum();
    if n_observed == 0.0 {
        return f64::NAN;
    }
    let residual = (target - reconstruction).component_mul(weights);
    residual.norm_squared() / n_observed
}

/// Checks a factor count against the matrix shape.
pub fn validate_n_factors(n_factors: usize, matrix: &MaskedMatrix) -> Result<()> {
    let (n_rows, n_cols) = matrix.shape();
    if n_factors == 0 || n_factors > n_rows.max(n_cols) {
        return Err(CfError::invalid_parameter(
            "n_factors",
            format!("must be in 1..={}, got {n_factors}", n_rows.max(n_cols)),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use emotioncf_core::masking::{Masking, MaskingConfig};
    use emotioncf_core::types::BoolMatrix;

    fn fixture() -> MaskedMatrix {
        let data = ScoreMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let mask = BoolMatrix::from_row_slice(
            3,
            3,
            &[true, false, true, true, false, false, false, false, true],
        );
        MaskedMatrix::with_masking(data, Masking::Explicit(mask), MaskingConfig::new()).unwrap()
    }

    #[test]
    fn test_column_means() {
        let matrix = fixture();
        assert_eq!(observed_column_means(&matrix), vec![Some(2.5), None, Some(6.0)]);
        // Global mean of 1, 3, 4, 9
        assert_relative_eq!(global_observed_mean(&matrix).unwrap(), 4.25);
        assert_eq!(column_means_with_fallback(&matrix).unwrap(), vec![2.5, 4.25, 6.0]);
    }

    #[test]
    fn test_observed_range() {
        assert_eq!(observed_range(&fixture()), Some((1.0, 9.0)));
    }

    #[test]
    fn test_masked_mse_ignores_hidden_cells() {
        let matrix = fixture();
        let target = matrix.masked_data_filled();
        let weights = matrix.observed_weights();
        let mut reconstruction = target.clone();
        reconstruction[(0, 1)] = 100.0;
        assert_relative_eq!(masked_mse(&target, &reconstruction, &weights), 0.0);
        reconstruction[(0, 0)] = 3.0;
        assert_relative_eq!(masked_mse(&target, &reconstruction, &weights), 1.0);
    }

    #[test]
    fn test_fully_hidden_matrix_cannot_be_fit() {
        let data = ScoreMatrix::zeros(2, 2);
        let mask = BoolMatrix::from_element(2, 2, false);
        let matrix =
            MaskedMatrix::with_masking(data, Masking::Explicit(mask), MaskingConfig::new()).unwrap();
        assert!(global_observed_mean(&matrix).is_err());
    }
}
