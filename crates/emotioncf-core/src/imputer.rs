//! The contract every imputation algorithm implements.
//!
//! An [`Imputer`] reads the masked view of a [`MaskedMatrix`] and returns a
//! dense prediction for every cell. It never mutates the matrix: the owning
//! model session stores the returned [`Imputation`] and keeps it aligned with
//! the matrix through downsampling.

use crate::convergence::Convergence;
use crate::error::Result;
use crate::masking::MaskedMatrix;
use crate::types::{is_present, ScoreMatrix};
use std::fmt::Debug;

/// Non-negative factor matrices of a factorisation model.
#[derive(Debug, Clone, PartialEq)]
pub struct Factors {
    /// Subjects × factors
    pub user: ScoreMatrix,
    /// Factors × items
    pub item: ScoreMatrix,
}

impl Factors {
    /// Number of latent factors.
    pub fn n_factors(&self) -> usize {
        self.user.ncols()
    }

    /// Low-rank reconstruction `user · item`.
    pub fn reconstruct(&self) -> ScoreMatrix {
        &self.user * &self.item
    }
}

/// Side information about how a fit filled the matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FitDiagnostics {
    /// Cells that had no usable neighbours and were filled by the column/global mean fallback
    pub fallback_cells: usize,
}

/// Output of one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    /// Dense predictions for every cell
    pub predictions: ScoreMatrix,
    /// Learning curve and termination state for iterative models
    pub convergence: Option<Convergence>,
    /// Factor matrices for factorisation models
    pub factors: Option<Factors>,
    /// Fallback bookkeeping
    pub diagnostics: FitDiagnostics,
}

impl Imputation {
    /// Wraps a prediction matrix with no further metadata.
    pub fn new(predictions: ScoreMatrix) -> Self {
        Self {
            predictions,
            convergence: None,
            factors: None,
            diagnostics: FitDiagnostics::default(),
        }
    }

    /// Attaches a convergence record.
    pub fn with_convergence(mut self, convergence: Convergence) -> Self {
        self.convergence = Some(convergence);
        self
    }

    /// Attaches factor matrices.
    pub fn with_factors(mut self, factors: Factors) -> Self {
        self.factors = Some(factors);
        self
    }

    /// Attaches fit diagnostics.
    pub fn with_diagnostics(mut self, diagnostics: FitDiagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// True if every prediction is a finite number.
    pub fn is_total(&self) -> bool {
        self.predictions.iter().all(|&v| is_present(v))
    }
}

/// A collaborative-filtering algorithm that fills every cell of a masked matrix.
pub trait Imputer: Debug {
    /// Human-readable algorithm name used in results tables.
    fn name(&self) -> &str;

    /// Fits the algorithm to the observed cells and predicts every cell.
    ///
    /// Implementations may assume the matrix is masked; the caller checks.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for hyperparameters incompatible with the
    /// matrix (e.g. `k` not smaller than the number of subjects).
    fn impute(&self, matrix: &MaskedMatrix) -> Result<Imputation>;
}
