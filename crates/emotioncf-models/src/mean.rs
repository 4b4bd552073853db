//! Column-mean imputation.

use crate::utils::{column_means_with_fallback, observed_column_means};
use emotioncf_core::{
    error::Result,
    imputer::{FitDiagnostics, Imputation, Imputer},
    masking::MaskedMatrix,
    types::ScoreMatrix,
};
use tracing::{info, warn};

/// Fills every hidden cell with the mean of its column's observed cells.
///
/// Observed cells keep their values. A column with nothing observed takes
/// the global observed mean instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mean;

impl Mean {
    /// Creates the mean imputer.
    pub fn new() -> Self {
        Self
    }
}

impl Imputer for Mean {
    fn name(&self) -> &str {
        "Mean"
    }

    fn impute(&self, matrix: &MaskedMatrix) -> Result<Imputation> {
        let means = column_means_with_fallback(matrix)?;
        let empty_columns = observed_column_means(matrix)
            .iter()
            .filter(|m| m.is_none())
            .count();
        if empty_columns > 0 {
            warn!(empty_columns, "columns without observations use the global mean");
        }

        let masked = matrix.masked_data();
        let predictions = ScoreMatrix::from_fn(masked.nrows(), masked.ncols(), |row, col| {
            if matrix.is_observed(row, col) {
                masked[(row, col)]
            } else {
                means[col]
            }
        });
        // An empty column has every one of its cells filled by the fallback
        let fallback_cells = empty_columns * masked.nrows();

        info!(hidden = matrix.n_hidden(), "fit mean model");
        Ok(Imputation::new(predictions).with_diagnostics(FitDiagnostics { fallback_cells }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotioncf_core::masking::{Masking, MaskingConfig};
    use emotioncf_core::types::BoolMatrix;

    #[test]
    fn test_hidden_cells_take_column_mean() {
        let data = ScoreMatrix::from_row_slice(3, 2, &[1.0, 10.0, 2.0, 20.0, 6.0, 30.0]);
        let mask = BoolMatrix::from_row_slice(3, 2, &[true, true, true, false, false, true]);
        let matrix =
            MaskedMatrix::with_masking(data, Masking::Explicit(mask), MaskingConfig::new()).unwrap();

        let imputation = Mean.impute(&matrix).unwrap();
        let p = &imputation.predictions;
        assert_eq!(p[(2, 0)], 1.5);
        assert_eq!(p[(1, 1)], 20.0);
        // Observed cells are untouched
        assert_eq!(p[(0, 0)], 1.0);
        assert_eq!(p[(2, 1)], 30.0);
        assert_eq!(imputation.diagnostics.fallback_cells, 0);
    }

    #[test]
    fn test_empty_column_uses_global_mean() {
        let data = ScoreMatrix::from_row_slice(2, 2, &[2.0, 9.0, 4.0, 9.0]);
        let mask = BoolMatrix::from_row_slice(2, 2, &[true, false, true, false]);
        let matrix =
            MaskedMatrix::with_masking(data, Masking::Explicit(mask), MaskingConfig::new()).unwrap();

        let imputation = Mean.impute(&matrix).unwrap();
        assert_eq!(imputation.predictions[(0, 1)], 3.0);
        assert_eq!(imputation.predictions[(1, 1)], 3.0);
        assert_eq!(imputation.diagnostics.fallback_cells, 2);
        assert!(imputation.is_total());
    }
}
