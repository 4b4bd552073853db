//! Core types for collaborative-filtering imputation of repeated-measures data.
//!
//! This crate holds everything the imputation algorithms share: the masked
//! data matrix, mask dilation, downsampling along the item axis, accuracy
//! metrics and the results tables, plus the [`Imputer`](imputer::Imputer)
//! contract the algorithms implement.
//!
//! # Key Concepts
//!
//! - **Mask**: which cells are observed (train) and which are held out (test)
//! - **Dilation**: widening held-out gaps to mimic realistic runs of missingness
//! - **Partitions**: `full`, `observed` and `missing` cells, scored separately
//!
//! # Modules
//!
//! - [`convergence`]: Learning curves and stopping rules for iterative fits
//! - [`dilation`]: Mask dilation
//! - [`downsample`]: Item-axis downsampling
//! - [`error`]: Error types
//! - [`imputer`]: The fit contract
//! - [`masking`]: The masked data matrix
//! - [`metrics`]: Accuracy metrics
//! - [`results`]: Long-form and per-subject results tables
//! - [`types`]: Type aliases and constants

pub mod convergence;
pub mod dilation;
pub mod downsample;
pub mod error;
pub mod imputer;
pub mod masking;
pub mod metrics;
pub mod results;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{CfError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use emotioncf_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::convergence::{Convergence, ConvergenceChecker, StoppingCriterion, TerminationReason};
    pub use crate::downsample::{Binning, TargetType};
    pub use crate::error::{CfError, Result};
    pub use crate::imputer::{Factors, FitDiagnostics, Imputation, Imputer};
    pub use crate::masking::{MaskedMatrix, Masking, MaskingConfig, NMaskItems};
    pub use crate::metrics::Metric;
    pub use crate::results::{Dataset, Group, ResultRow, ResultsTable, Summary, UserResults};
    pub use crate::types::{BoolMatrix, DMatrix, DVector, ScoreMatrix};
}
