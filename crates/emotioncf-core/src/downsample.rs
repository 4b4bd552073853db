//! Downsampling along the item (time) axis.
//!
//! The target number of columns is derived from `n_samples` and, depending on
//! [`TargetType`], from the sampling frequency of the recording. Columns are
//! then assigned to contiguous bins and every artefact (data, mask, dilated
//! mask, predictions) is aggregated over the same bins so that they keep
//! sharing one shape.

use crate::error::{CfError, Result};
use crate::types::{is_present, BoolMatrix, ScoreMatrix, MISSING};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How `n_samples` is interpreted when computing the downsampled width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TargetType {
    /// Target width is `n_samples` columns
    Samples,
    /// Target width is `floor(I / (n_samples * sampling_freq))`
    Seconds,
    /// Target width is `floor(I / (sampling_freq / n_samples))`
    Hz,
}

impl TargetType {
    /// Lower-case name of the target type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Samples => "samples",
            TargetType::Seconds => "seconds",
            TargetType::Hz => "hz",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = CfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "samples" => Ok(TargetType::Samples),
            "seconds" => Ok(TargetType::Seconds),
            "hz" => Ok(TargetType::Hz),
            other => Err(CfError::invalid_parameter(
                "target_type",
                format!("expected one of samples, seconds, hz; got `{other}`"),
            )),
        }
    }
}

/// Computes the downsampled number of columns.
///
/// Fails if an argument is not strictly positive or the resulting width is
/// zero or wider than the current matrix.
pub fn target_width(
    n_items: usize,
    sampling_freq: f64,
    n_samples: f64,
    target_type: TargetType,
) -> Result<usize> {
    if !(n_samples.is_finite() && n_samples > 0.0) {
        return Err(CfError::invalid_parameter(
            "n_samples",
            format!("must be positive, got {n_samples}"),
        ));
    }
    if target_type != TargetType::Samples && !(sampling_freq.is_finite() && sampling_freq > 0.0) {
        return Err(CfError::invalid_parameter(
            "sampling_freq",
            format!("must be positive, got {sampling_freq}"),
        ));
    }

    let n = n_items as f64;
    let width = match target_type {
        TargetType::Samples => {
            if n_samples.fract() != 0.0 {
                return Err(CfError::invalid_parameter(
                    "n_samples",
                    format!("must be a whole number of columns, got {n_samples}"),
                ));
            }
            n_samples
        }
        TargetType::Seconds => (n / (n_samples * sampling_freq)).floor(),
        // I / (f / n) computed as I * n / f to avoid rounding the period first
        TargetType::Hz => (n * n_samples / sampling_freq).floor(),
    };

    if width < 1.0 {
        return Err(CfError::invalid_parameter(
            "n_samples",
            format!("{target_type} target leaves no columns out of {n_items}"),
        ));
    }
    if width > n {
        return Err(CfError::invalid_parameter(
            "n_samples",
            format!("{target_type} target of {width} columns exceeds the {n_items} available"),
        ));
    }

    Ok(width as usize)
}

/// Assignment of the original columns to contiguous downsampling bins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binning {
    bins: Vec<usize>,
    width: usize,
}

impl Binning {
    /// Bins `n_items` columns into `width` contiguous groups of near-equal size.
    pub fn new(n_items: usize, width: usize) -> Result<Self> {
        if width == 0 || width > n_items {
            return Err(CfError::invalid_parameter(
                "width",
                format!("must be in 1..={n_items}, got {width}"),
            ));
        }
        let bins = (0..n_items).map(|col| col * width / n_items).collect();
        Ok(Self { bins, width })
    }

    /// Number of columns after downsampling.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of columns before downsampling.
    pub fn n_items(&self) -> usize {
        self.bins.len()
    }

    /// Bin index of an original column, `None` past the last column.
    pub fn bin_of(&self, col: usize) -> Option<usize> {
        self.bins.get(col).copied()
    }

    fn check_columns(&self, n_cols: usize) -> Result<()> {
        if n_cols != self.bins.len() {
            return Err(CfError::shape_mismatch(
                format!("{} columns", self.bins.len()),
                format!("{n_cols} columns"),
            ));
        }
        Ok(())
    }

    /// Block-averages a score matrix, skipping missing values.
    ///
    /// A block with no present value stays missing.
    pub fn average(&self, matrix: &ScoreMatrix) -> Result<ScoreMatrix> {
        self.check_columns(matrix.ncols())?;
        let n_rows = matrix.nrows();
        let mut sums = ScoreMatrix::zeros(n_rows, self.width);
        let mut counts = vec![0usize; n_rows * self.width];

        for (col, &bin) in self.bins.iter().enumerate() {
            for row in 0..n_rows {
                let value = matrix[(row, col)];
                if is_present(value) {
                    sums[(row, bin)] += value;
                    counts[bin * n_rows + row] += 1;
                }
            }
        }

        Ok(ScoreMatrix::from_fn(n_rows, self.width, |row, bin| {
            match counts[bin * n_rows + row] {
                0 => MISSING,
                count => sums[(row, bin)] / count as f64,
            }
        }))
    }

    /// Downsamples a mask: a block is observed if any of its cells was observed.
    pub fn any(&self, mask: &BoolMatrix) -> Result<BoolMatrix> {
        self.check_columns(mask.ncols())?;
        let mut out = BoolMatrix::from_element(mask.nrows(), self.width, false);
        for (col, &bin) in self.bins.iter().enumerate() {
            for row in 0..mask.nrows() {
                if mask[(row, col)] {
                    out[(row, bin)] = true;
                }
            }
        }
        Ok(out)
    }
}
