//! Imputation algorithms for repeated-measures collaborative filtering.
//!
//! Every algorithm implements [`Imputer`] and is driven through a [`Model`]
//! session, which owns the masked matrix and the fitted predictions.
//!
//! # Available Algorithms
//!
//! - **Mean**: column-mean imputation
//! - **KNN**: similarity-weighted average of the `k` nearest subjects
//! - **NNMF (multiplicative)**: masked Lee–Seung updates
//! - **NNMF (SGD)**: per-cell gradient steps with biases and L2 penalties
//!
//! # Examples
//!
//! ```rust
//! use emotioncf_models::{Knn, KnnConfig, KnnMetric, Model};
//! use emotioncf_core::masking::{Masking, NMaskItems};
//! use emotioncf_core::types::ScoreMatrix;
//!
//! let data = ScoreMatrix::from_fn(6, 20, |r, c| ((r + 1) * c) as f64);
//! let knn = Knn::with_config(KnnConfig::new().with_k(3).with_metric(KnnMetric::Cosine));
//! let mut model = Model::with_masking(knn, data, Masking::Random(NMaskItems::Fraction(0.25)))?;
//! model.fit()?;
//! assert_eq!(model.predictions().map(|p| p.shape()), Some((6, 20)));
//! # Ok::<(), emotioncf_core::CfError>(())
//! ```

pub mod factorization;
pub mod knn;
pub mod mean;
pub mod model;
pub mod nnmf_mult;
pub mod nnmf_sgd;
pub mod similarity;
pub mod step_size;
pub mod utils;

pub use factorization::FactorHeuristic;
pub use knn::{Knn, KnnConfig};
pub use mean::Mean;
pub use model::{FitState, Model};
pub use nnmf_mult::{NnmfMult, NnmfMultConfig};
pub use nnmf_sgd::{NnmfSgd, NnmfSgdConfig};
pub use similarity::KnnMetric;
pub use step_size::StepSizeSchedule;

// Re-export commonly used items from core
pub use emotioncf_core::{
    error::{CfError, Result},
    imputer::{Imputation, Imputer},
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        FactorHeuristic, FitState, Knn, KnnConfig, KnnMetric, Mean, Model, NnmfMult,
        NnmfMultConfig, NnmfSgd, NnmfSgdConfig, StepSizeSchedule,
    };
    pub use emotioncf_core::prelude::*;
}
