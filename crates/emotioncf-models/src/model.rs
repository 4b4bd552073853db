//! A fitting session: one algorithm, one masked matrix, its predictions.
//!
//! [`Model`] owns the data, the masks and the fitted predictions so that every
//! shape-dependent artefact moves together. Downsampling a fitted model
//! block-averages the predictions with the same binning as the data, and
//! drops factor matrices that no longer match the item axis.
//!
//! # Example
//!
//! ```
//! use emotioncf_models::prelude::*;
//!
//! let data = ScoreMatrix::from_fn(4, 10, |r, c| (r + c) as f64);
//! let mut model = Model::with_masking(
//!     Mean::new(),
//!     data,
//!     Masking::Random(NMaskItems::Fraction(0.3)),
//! )?;
//! model.fit()?;
//! let summary = model.summary()?;
//! assert_eq!(summary.overall.len(), 24);
//! # Ok::<(), emotioncf_models::CfError>(())
//! ```

use emotioncf_core::{
    convergence::Convergence,
    downsample::TargetType,
    error::{CfError, Result},
    imputer::{Imputation, Imputer},
    masking::{MaskedMatrix, Masking, MaskingConfig},
    results::{partition_pairs, summarize, Dataset, Summary},
    types::{BoolMatrix, ScoreMatrix},
};
use tracing::{debug, info};

/// Whether a model holds predictions for its current matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FitState {
    /// No successful fit yet, or the last one was invalidated by re-masking
    #[default]
    Unfit,
    /// Predictions aligned with the current matrix shape
    Fit(Imputation),
}

impl FitState {
    /// The imputation, if fit.
    pub fn imputation(&self) -> Option<&Imputation> {
        match self {
            Self::Unfit => None,
            Self::Fit(imputation) => Some(imputation),
        }
    }
}

/// A collaborative-filtering model session.
#[derive(Debug, Clone)]
pub struct Model<A: Imputer> {
    algorithm: A,
    matrix: MaskedMatrix,
    state: FitState,
}

impl<A: Imputer> Model<A> {
    /// Wraps `data` without masking. Call [`Model::create_masked_data`] before fitting.
    pub fn new(algorithm: A, data: ScoreMatrix) -> Result<Self> {
        Self::with_config(algorithm, data, Masking::None, MaskingConfig::default())
    }

    /// Wraps `data` and applies `masking` with an unseeded RNG.
    pub fn with_masking(algorithm: A, data: ScoreMatrix, masking: Masking) -> Result<Self> {
        Self::with_config(algorithm, data, masking, MaskingConfig::default())
    }

    /// Wraps `data` and applies `masking` with the given masking configuration.
    pub fn with_config(
        algorithm: A,
        data: ScoreMatrix,
        masking: Masking,
        config: MaskingConfig,
    ) -> Result<Self> {
        let matrix = MaskedMatrix::with_masking(data, masking, config)?;
        Ok(Self::from_matrix(algorithm, matrix))
    }

    /// Wraps an existing masked matrix.
    pub fn from_matrix(algorithm: A, matrix: MaskedMatrix) -> Self {
        Self {
            algorithm,
            matrix,
            state: FitState::Unfit,
        }
    }

    /// Re-masks the data. Discards dilation and any previous fit.
    pub fn create_masked_data(&mut self, masking: Masking) -> Result<()> {
        self.matrix.create_masked_data(masking)?;
        self.state = FitState::Unfit;
        Ok(())
    }

    /// Dilates the mask by `n_samples` on each side of every hidden cell.
    ///
    /// An existing fit is discarded, since it was trained on the old mask.
    pub fn dilate_mask(&mut self, n_samples: usize) -> Result<()> {
        self.matrix.dilate_mask(n_samples)?;
        self.state = FitState::Unfit;
        Ok(())
    }

    /// Fits the algorithm to the observed cells.
    ///
    /// # Errors
    ///
    /// `NotMasked` if no mask exists, or whatever the algorithm rejects.
    pub fn fit(&mut self) -> Result<()> {
        self.matrix.ensure_masked("fit")?;
        let imputation = self.algorithm.impute(&self.matrix)?;
        info!(
            algorithm = self.algorithm.name(),
            shape = ?self.matrix.shape(),
            dilated = self.matrix.is_mask_dilated(),
            "model fit"
        );
        self.state = FitState::Fit(imputation);
        Ok(())
    }

    /// Dilates the mask, then fits.
    pub fn fit_dilated(&mut self, n_samples: usize) -> Result<()> {
        self.matrix.ensure_masked("fit")?;
        self.dilate_mask(n_samples)?;
        self.fit()
    }

    /// Downsamples the item axis of every artefact, predictions included.
    pub fn downsample(
        &mut self,
        sampling_freq: f64,
        n_samples: f64,
        target_type: TargetType,
    ) -> Result<()> {
        let binning = self.matrix.downsample(sampling_freq, n_samples, target_type)?;
        if let FitState::Fit(imputation) = &mut self.state {
            imputation.predictions = binning.average(&imputation.predictions)?;
            if imputation.factors.take().is_some() {
                debug!("dropped factor matrices after downsampling");
            }
        }
        Ok(())
    }

    /// Long-form and per-subject accuracy tables.
    ///
    /// # Errors
    ///
    /// `NotFit` until [`Model::fit`] succeeds.
    pub fn summary(&self) -> Result<Summary> {
        let imputation = self.require_fit("summary")?;
        summarize(
            self.algorithm.name(),
            self.matrix.data(),
            self.matrix.effective_mask(),
            &imputation.predictions,
        )
    }

    /// `(truth, prediction)` pairs for one partition, skipping cells with no truth.
    pub fn prediction_pairs(&self, dataset: Dataset) -> Result<Vec<(f64, f64)>> {
        let imputation = self.require_fit("prediction_pairs")?;
        let (truth, predicted) = partition_pairs(
            self.matrix.data(),
            self.matrix.effective_mask(),
            &imputation.predictions,
            dataset,
            None,
        )?;
        Ok(truth.into_iter().zip(predicted).collect())
    }

    fn require_fit(&self, operation: &str) -> Result<&Imputation> {
        self.state.imputation().ok_or_else(|| CfError::not_fit(operation))
    }

    /// True once a fit succeeded for the current mask.
    pub fn is_fit(&self) -> bool {
        matches!(self.state, FitState::Fit(_))
    }

    /// Fit state.
    pub fn state(&self) -> &FitState {
        &self.state
    }

    /// Dense predictions, once fit.
    pub fn predictions(&self) -> Option<&ScoreMatrix> {
        self.state.imputation().map(|i| &i.predictions)
    }

    /// Convergence record of an iterative fit.
    pub fn convergence(&self) -> Option<&Convergence> {
        self.state.imputation().and_then(|i| i.convergence.as_ref())
    }

    /// Per-iteration training loss of an iterative fit.
    pub fn learning_curve(&self) -> Option<&[f64]> {
        self.convergence().map(|c| c.learning_curve())
    }

    /// The algorithm.
    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// Mutable access to the algorithm; a later [`Model::fit`] uses the changes.
    pub fn algorithm_mut(&mut self) -> &mut A {
        &mut self.algorithm
    }

    /// The masked matrix.
    pub fn matrix(&self) -> &MaskedMatrix {
        &self.matrix
    }

    /// Ground-truth data.
    pub fn data(&self) -> &ScoreMatrix {
        self.matrix.data()
    }

    /// Observation mask.
    pub fn mask(&self) -> &BoolMatrix {
        self.matrix.mask()
    }

    /// Data with held-out cells set to `NaN`.
    pub fn masked_data(&self) -> &ScoreMatrix {
        self.matrix.masked_data()
    }

    /// True once a mask has been created.
    pub fn is_masked(&self) -> bool {
        self.matrix.is_masked()
    }

    /// True while the mask is dilated.
    pub fn is_mask_dilated(&self) -> bool {
        self.matrix.is_mask_dilated()
    }

    /// True if the ground truth has no missing values.
    pub fn is_dense(&self) -> bool {
        self.matrix.is_dense()
    }
}
