//! # emotioncf
//!
//! Collaborative-filtering imputation for repeated-measures data: matrices of
//! subjects × time-ordered items, such as continuous emotion ratings or
//! physiological recordings.
//!
//! ## Overview
//!
//! A [`Model`] pairs an algorithm with a masked copy of the data. Masking
//! holds out a share of each subject's items; the algorithm is fit to what
//! remains and predicts every cell; [`Model::summary`] scores the predictions
//! on the full, observed and held-out partitions.
//!
//! ## Quick Start
//!
//! ```rust
//! use emotioncf::prelude::*;
//!
//! let data = ScoreMatrix::from_fn(10, 40, |r, c| 50.0 + (c as f64 / 4.0).sin() * (r + 1) as f64);
//! let mut model = Model::with_config(
//!     NnmfMult::with_config(NnmfMultConfig::new().with_n_factors(3).with_seed(1)),
//!     data,
//!     Masking::Random(NMaskItems::Fraction(0.25)),
//!     MaskingConfig::new().with_seed(1),
//! )?;
//! model.fit()?;
//!
//! let summary = model.summary()?;
//! let rmse = summary.overall.score(Metric::Rmse, Dataset::Missing, Group::All);
//! assert!(rmse.is_some());
//! # Ok::<(), CfError>(())
//! ```
//!
//! ## Algorithms
//!
//! - [`Mean`]: column means
//! - [`Knn`]: nearest subjects by Pearson, cosine or Euclidean similarity
//! - [`NnmfMult`]: non-negative factorisation by multiplicative updates
//! - [`NnmfSgd`]: non-negative factorisation by stochastic gradient descent

pub use emotioncf_core;
pub use emotioncf_models;

pub use emotioncf_core::{
    convergence::{Convergence, StoppingCriterion, TerminationReason},
    downsample::TargetType,
    error::{CfError, Result},
    imputer::{Imputation, Imputer},
    masking::{MaskedMatrix, Masking, MaskingConfig, NMaskItems},
    metrics::Metric,
    results::{Dataset, Group, ResultRow, ResultsTable, Summary, UserResults},
    types::{BoolMatrix, ScoreMatrix},
};
pub use emotioncf_models::{
    FactorHeuristic, FitState, Knn, KnnConfig, KnnMetric, Mean, Model, NnmfMult, NnmfMultConfig,
    NnmfSgd, NnmfSgdConfig, StepSizeSchedule,
};

pub use nalgebra;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use emotioncf_models::prelude::*;
}
