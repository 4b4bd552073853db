//! The masked data matrix shared by every model.
//!
//! [`MaskedMatrix`] owns the ground-truth data together with every artefact
//! derived from it:
//!
//! - the observation **mask** (`true` = observed, `false` = held out),
//! - the optional **dilated mask**, which widens held-out gaps,
//! - the **masked data** view, where held-out cells are `NaN`.
//!
//! The effective mask is the dilated mask while dilation is active and the
//! plain mask otherwise; masked data, fitting and scoring all go through it.
//! All artefacts share the data's shape at all times, and
//! [`MaskedMatrix::downsample`] resizes them together.

use crate::dilation::{dilate_hidden, hidden_count};
use crate::downsample::{target_width, Binning, TargetType};
use crate::error::{CfError, Result};
use crate::types::{format_shape, is_present, BoolMatrix, ScoreMatrix, Shape, MISSING};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of items to hide in every row when masking at random.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NMaskItems {
    /// Fraction of the row's items, in `[0, 1]`; the count is `floor(I * f)`
    Fraction(f64),
    /// Absolute number of items
    Count(usize),
}

impl NMaskItems {
    /// Resolves the number of hidden items for a row of `n_items` columns.
    pub fn items_per_row(&self, n_items: usize) -> Result<usize> {
        match *self {
            NMaskItems::Fraction(f) => {
                if !(0.0..=1.0).contains(&f) {
                    return Err(CfError::invalid_parameter(
                        "n_mask_items",
                        format!("fraction must be in [0, 1], got {f}"),
                    ));
                }
                Ok((n_items as f64 * f).floor() as usize)
            }
            NMaskItems::Count(n) => {
                if n > n_items {
                    return Err(CfError::invalid_parameter(
                        "n_mask_items",
                        format!("cannot hide {n} items out of {n_items}"),
                    ));
                }
                Ok(n)
            }
        }
    }
}

impl From<f64> for NMaskItems {
    fn from(fraction: f64) -> Self {
        NMaskItems::Fraction(fraction)
    }
}

impl From<usize> for NMaskItems {
    fn from(count: usize) -> Self {
        NMaskItems::Count(count)
    }
}

/// How the held-out cells are chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum Masking {
    /// No masking: every cell is observed and fitting is not possible
    None,
    /// Caller-supplied mask, `true` = observed
    Explicit(BoolMatrix),
    /// Hide a number of items per row, chosen uniformly without replacement
    Random(NMaskItems),
}

/// Configuration of the masking subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskingConfig {
    /// Seed for random masking; `None` draws from system entropy
    pub seed: Option<u64>,
}

impl MaskingConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the seed used by random masking.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Data matrix plus mask, dilated mask and masked-data view.
#[derive(Debug, Clone)]
pub struct MaskedMatrix {
    data: ScoreMatrix,
    mask: BoolMatrix,
    dilated_mask: Option<BoolMatrix>,
    dilation_samples: Option<usize>,
    masked_data: ScoreMatrix,
    n_mask_items: Option<NMaskItems>,
    is_masked: bool,
    config: MaskingConfig,
}

impl MaskedMatrix {
    /// Wraps a data matrix without masking.
    pub fn new(data: ScoreMatrix) -> Result<Self> {
        Self::with_config(data, MaskingConfig::default())
    }

    /// Wraps a data matrix with an explicit masking configuration.
    pub fn with_config(data: ScoreMatrix, config: MaskingConfig) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(CfError::invalid_parameter(
                "data",
                format!("must have at least one row and column, got {}", format_shape(data.shape())),
            ));
        }
        let mask = BoolMatrix::from_element(data.nrows(), data.ncols(), true);
        let masked_data = data.clone();
        Ok(Self {
            data,
            mask,
            dilated_mask: None,
            dilation_samples: None,
            masked_data,
            n_mask_items: None,
            is_masked: false,
            config,
        })
    }

    /// Wraps a data matrix and applies `masking` immediately.
    pub fn with_masking(data: ScoreMatrix, masking: Masking, config: MaskingConfig) -> Result<Self> {
        let mut matrix = Self::with_config(data, config)?;
        matrix.create_masked_data(masking)?;
        Ok(matrix)
    }

    /// Builds the mask and masked data.
    ///
    /// Any previous dilation is discarded. `Masking::None` resets the matrix
    /// to the unmasked state.
    pub fn create_masked_data(&mut self, masking: Masking) -> Result<()> {
        let (n_rows, n_cols) = self.shape();
        match masking {
            Masking::None => {
                self.mask = BoolMatrix::from_element(n_rows, n_cols, true);
                self.n_mask_items = None;
                self.is_masked = false;
            }
            Masking::Explicit(mask) => {
                if mask.shape() != self.shape() {
                    return Err(CfError::shape_mismatch(
                        format_shape(self.shape()),
                        format_shape(mask.shape()),
                    ));
                }
                self.mask = mask;
                self.n_mask_items = None;
                self.is_masked = true;
            }
            Masking::Random(n_mask_items) => {
                let n_hidden = n_mask_items.items_per_row(n_cols)?;
                let mut rng = self.config.rng();
                let mut mask = BoolMatrix::from_element(n_rows, n_cols, true);
                for row in 0..n_rows {
                    for col in rand::seq::index::sample(&mut rng, n_cols, n_hidden) {
                        mask[(row, col)] = false;
                    }
                }
                self.mask = mask;
                self.n_mask_items = Some(n_mask_items);
                self.is_masked = true;
            }
        }

        self.dilated_mask = None;
        self.dilation_samples = None;
        self.refresh_masked_data();

        debug!(
            hidden = hidden_count(&self.mask),
            masked = self.is_masked,
            "created masked data"
        );
        Ok(())
    }

    /// Widens held-out gaps by `n_samples` cells on each side.
    ///
    /// Dilation is always derived from the undilated mask, so calling this
    /// again replaces the previous dilation instead of compounding it.
    pub fn dilate_mask(&mut self, n_samples: usize) -> Result<()> {
        if !self.is_masked {
            return Err(CfError::not_masked("dilate_mask"));
        }
        let dilated = dilate_hidden(&self.mask, n_samples);
        debug!(
            n_samples,
            hidden_before = hidden_count(&self.mask),
            hidden_after = hidden_count(&dilated),
            "dilated mask"
        );
        self.dilated_mask = Some(dilated);
        self.dilation_samples = Some(n_samples);
        self.refresh_masked_data();
        Ok(())
    }

    /// Downsamples every artefact along the item axis.
    ///
    /// Returns the column binning so owners of further shape-dependent
    /// artefacts (e.g. predictions) can resize them identically.
    pub fn downsample(
        &mut self,
        sampling_freq: f64,
        n_samples: f64,
        target_type: TargetType,
    ) -> Result<Binning> {
        let width = target_width(self.n_items(), sampling_freq, n_samples, target_type)?;
        let binning = Binning::new(self.n_items(), width)?;

        let data = binning.average(&self.data)?;
        let mask = binning.any(&self.mask)?;
        let dilated_mask = match &self.dilated_mask {
            Some(dilated) => Some(binning.any(dilated)?),
            None => None,
        };

        debug!(
            from = self.n_items(),
            to = width,
            %target_type,
            "downsampled item axis"
        );

        self.data = data;
        self.mask = mask;
        self.dilated_mask = dilated_mask;
        self.refresh_masked_data();
        Ok(binning)
    }

    fn refresh_masked_data(&mut self) {
        let mask = self.effective_mask();
        let masked = ScoreMatrix::from_fn(self.data.nrows(), self.data.ncols(), |row, col| {
            if mask[(row, col)] {
                self.data[(row, col)]
            } else {
                MISSING
            }
        });
        self.masked_data = masked;
    }

    /// Ground-truth data.
    pub fn data(&self) -> &ScoreMatrix {
        &self.data
    }

    /// Observation mask, `true` = observed. All `true` when unmasked.
    pub fn mask(&self) -> &BoolMatrix {
        &self.mask
    }

    /// Dilated mask, if dilation is active.
    pub fn dilated_mask(&self) -> Option<&BoolMatrix> {
        self.dilated_mask.as_ref()
    }

    /// The mask models fit against and results are scored with.
    pub fn effective_mask(&self) -> &BoolMatrix {
        self.dilated_mask.as_ref().unwrap_or(&self.mask)
    }

    /// Data with held-out cells replaced by `NaN`.
    pub fn masked_data(&self) -> &ScoreMatrix {
        &self.masked_data
    }

    /// Per-row masking specification used for random masking, if any.
    pub fn n_mask_items(&self) -> Option<NMaskItems> {
        self.n_mask_items
    }

    /// Dilation width in samples, if dilation is active.
    pub fn dilation_samples(&self) -> Option<usize> {
        self.dilation_samples
    }

    /// True once a mask has been created.
    pub fn is_masked(&self) -> bool {
        self.is_masked
    }

    /// True while dilation is active.
    pub fn is_mask_dilated(&self) -> bool {
        self.dilated_mask.is_some()
    }

    /// True if the ground-truth data has no missing values.
    pub fn is_dense(&self) -> bool {
        self.data.iter().all(|&v| is_present(v))
    }

    /// Shape of the data as `(subjects, items)`.
    pub fn shape(&self) -> Shape {
        self.data.shape()
    }

    /// Number of subjects (rows).
    pub fn n_subjects(&self) -> usize {
        self.data.nrows()
    }

    /// Number of items (columns).
    pub fn n_items(&self) -> usize {
        self.data.ncols()
    }

    /// True if the cell is available for training.
    #[inline]
    pub fn is_observed(&self, row: usize, col: usize) -> bool {
        is_present(self.masked_data[(row, col)])
    }

    /// Training cells in row-major order.
    pub fn observed_cells(&self) -> Vec<(usize, usize)> {
        let (n_rows, n_cols) = self.shape();
        (0..n_rows)
            .flat_map(|row| (0..n_cols).map(move |col| (row, col)))
            .filter(|&(row, col)| self.is_observed(row, col))
            .collect()
    }

    /// 0/1 weight matrix of training cells.
    pub fn observed_weights(&self) -> ScoreMatrix {
        self.masked_data.map(|v| if is_present(v) { 1.0 } else { 0.0 })
    }

    /// Masked data with missing cells set to zero.
    pub fn masked_data_filled(&self) -> ScoreMatrix {
        self.masked_data.map(|v| if is_present(v) { v } else { 0.0 })
    }

    /// Number of cells hidden by the effective mask.
    pub fn n_hidden(&self) -> usize {
        hidden_count(self.effective_mask())
    }

    /// Fails with `NotMasked` unless a mask exists.
    pub fn ensure_masked(&self, operation: &str) -> Result<()> {
        if self.is_masked {
            Ok(())
        } else {
            Err(CfError::not_masked(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dilation::hidden_per_row;

    fn ramp(n_rows: usize, n_cols: usize) -> ScoreMatrix {
        ScoreMatrix::from_fn(n_rows, n_cols, |r, c| (r * n_cols + c) as f64)
    }

    #[test]
    fn test_unmasked_matrix_has_no_missing() {
        let matrix = MaskedMatrix::new(ramp(3, 4)).unwrap();
        assert!(!matrix.is_masked());
        assert!(matrix.masked_data().iter().all(|v| v.is_finite()));
        assert!(matches!(
            matrix.ensure_masked("fit"),
            Err(CfError::NotMasked { .. })
        ));
    }

    #[test]
    fn test_empty_data_is_rejected() {
        assert!(MaskedMatrix::new(ScoreMatrix::zeros(0, 3)).is_err());
    }

    #[test]
    fn test_random_fraction_masking() {
        let config = MaskingConfig::new().with_seed(7);
        let matrix =
            MaskedMatrix::with_masking(ramp(5, 10), Masking::Random(NMaskItems::Fraction(0.35)), config).unwrap();
        assert!(matrix.is_masked());
        // floor(10 * 0.35) == 3 hidden per row
        assert_eq!(hidden_per_row(matrix.mask()), vec![3; 5]);
        for row in matrix.masked_data().row_iter() {
            assert_eq!(row.iter().filter(|v| v.is_nan()).count(), 3);
        }
    }

    #[test]
    fn test_random_count_masking_is_reproducible() {
        let config = MaskingConfig::new().with_seed(42);
        let a = MaskedMatrix::with_masking(ramp(4, 8), Masking::Random(NMaskItems::Count(2)), config)
            .unwrap();
        let b = MaskedMatrix::with_masking(ramp(4, 8), Masking::Random(NMaskItems::Count(2)), config)
            .unwrap();
        assert_eq!(a.mask(), b.mask());
        assert_eq!(hidden_per_row(a.mask()), vec![2; 4]);
    }

    #[test]
    fn test_invalid_mask_items() {
        let mut matrix = MaskedMatrix::new(ramp(2, 4)).unwrap();
        assert!(matrix.create_masked_data(Masking::Random(NMaskItems::Fraction(1.5))).is_err());
        assert!(matrix.create_masked_data(Masking::Random(NMaskItems::Count(5))).is_err());
        assert!(!matrix.is_masked());
    }

    #[test]
    fn test_explicit_mask_shape_mismatch() {
        let mut matrix = MaskedMatrix::new(ramp(2, 3)).unwrap();
        let err = matrix
            .create_masked_data(Masking::Explicit(BoolMatrix::from_element(3, 2, true)))
            .unwrap_err();
        assert_eq!(err, CfError::shape_mismatch("(2, 3)", "(3, 2)"));
    }

    #[test]
    fn test_explicit_mask_drives_masked_data() {
        let mask = BoolMatrix::from_row_slice(2, 3, &[true, false, true, false, true, true]);
        let matrix =
            MaskedMatrix::with_masking(ramp(2, 3), Masking::Explicit(mask), MaskingConfig::new())
                .unwrap();
        assert!(matrix.masked_data()[(0, 1)].is_nan());
        assert!(matrix.masked_data()[(1, 0)].is_nan());
        assert_eq!(matrix.masked_data()[(1, 2)], 5.0);
        assert_eq!(matrix.observed_cells(), vec![(0, 0), (0, 2), (1, 1), (1, 2)]);
        assert_eq!(matrix.n_hidden(), 2);
    }

    #[test]
    fn test_dilation_requires_mask_and_does_not_compound() {
        let mut matrix = MaskedMatrix::new(ramp(1, 9)).unwrap();
        assert!(matches!(
            matrix.dilate_mask(1),
            Err(CfError::NotMasked { .. })
        ));

        let mut mask = BoolMatrix::from_element(1, 9, true);
        mask[(0, 4)] = false;
        matrix.create_masked_data(Masking::Explicit(mask)).unwrap();

        matrix.dilate_mask(1).unwrap();
        assert!(matrix.is_mask_dilated());
        assert_eq!(matrix.n_hidden(), 3);

        matrix.dilate_mask(1).unwrap();
        assert_eq!(matrix.n_hidden(), 3);
        assert_eq!(matrix.masked_data().iter().filter(|v| v.is_nan()).count(), 3);

        matrix.dilate_mask(2).unwrap();
        assert_eq!(matrix.dilation_samples(), Some(2));
        assert_eq!(matrix.n_hidden(), 5);
    }

    #[test]
    fn test_remasking_clears_dilation() {
        let config = MaskingConfig::new().with_seed(1);
        let mut matrix =
            MaskedMatrix::with_masking(ramp(2, 10), Masking::Random(NMaskItems::Count(1)), config)
                .unwrap();
        matrix.dilate_mask(2).unwrap();
        matrix
            .create_masked_data(Masking::Random(NMaskItems::Count(1)))
            .unwrap();
        assert!(!matrix.is_mask_dilated());
        assert_eq!(matrix.n_hidden(), 2);
    }

    #[test]
    fn test_downsample_resizes_all_artifacts() {
        let config = MaskingConfig::new().with_seed(3);
        let mut matrix =
            MaskedMatrix::with_masking(ramp(3, 20), Masking::Random(NMaskItems::Fraction(0.5)), config).unwrap();
        matrix.dilate_mask(1).unwrap();

        let binning = matrix.downsample(10.0, 5.0, TargetType::Hz).unwrap();
        assert_eq!(binning.width(), 10);
        assert_eq!(matrix.shape(), (3, 10));
        assert_eq!(matrix.mask().shape(), (3, 10));
        assert_eq!(matrix.dilated_mask().unwrap().shape(), (3, 10));
        assert_eq!(matrix.masked_data().shape(), (3, 10));
        assert!(matrix.is_masked());
    }

    #[test]
    fn test_is_dense() {
        let mut data = ramp(2, 2);
        assert!(MaskedMatrix::new(data.clone()).unwrap().is_dense());
        data[(1, 1)] = f64::NAN;
        let matrix = MaskedMatrix::new(data).unwrap();
        assert!(!matrix.is_dense());
        assert!(!matrix.is_observed(1, 1));
    }
}
