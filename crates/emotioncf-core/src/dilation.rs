//! Mask dilation: widening held-out gaps along the item axis.
//!
//! Repeated-measures data rarely loses isolated samples; gaps come in runs.
//! Dilation simulates that by hiding, for every hidden cell, up to
//! `n_samples` neighbours on each side within the same row. Neighbours are
//! clipped at the row boundaries, never wrapped.

use crate::types::BoolMatrix;

/// Widens every hidden (`false`) run of `mask` by `n_samples` cells on each side.
///
/// The result hides a superset of the cells hidden by `mask`; observed cells
/// only become hidden when they lie within `n_samples` of a hidden one.
pub fn dilate_hidden(mask: &BoolMatrix, n_samples: usize) -> BoolMatrix {
    let (n_rows, n_cols) = mask.shape();
    let mut dilated = mask.clone();
    if n_samples == 0 || n_cols == 0 {
        return dilated;
    }

    for row in 0..n_rows {
        for col in 0..n_cols {
            if mask[(row, col)] {
                continue;
            }
            let start = col.saturating_sub(n_samples);
            let end = (col + n_samples).min(n_cols - 1);
            for neighbour in start..=end {
                dilated[(row, neighbour)] = false;
            }
        }
    }

    dilated
}

/// Number of hidden cells in each row.
pub fn hidden_per_row(mask: &BoolMatrix) -> Vec<usize> {
    mask.row_iter()
        .map(|row| row.iter().filter(|&&observed| !observed).count())
        .collect()
}

/// Total number of hidden cells.
pub fn hidden_count(mask: &BoolMatrix) -> usize {
    mask.iter().filter(|&&observed| !observed).count()
}
