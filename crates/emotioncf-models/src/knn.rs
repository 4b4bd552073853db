//! K-nearest-neighbour imputation.
//!
//! Every hidden cell `(u, i)` is predicted from the `k` subjects most similar
//! to `u` that have item `i` observed:
//!
//! ```text
//! r̂(u, i) = Σ_v w(u, v) · r(v, i) / Σ_v w(u, v),   w = max(sim, 0)
//! ```
//!
//! When the clipped weights sum to zero, or weighting is turned off, the
//! neighbours' values are averaged without weights. A cell with no usable
//! neighbour at all falls back to its column's observed mean, then to the
//! global observed mean, and is counted in the fit diagnostics.

use crate::similarity::{subject_similarity, KnnMetric};
use crate::utils::column_means_with_fallback;
use emotioncf_core::{
    error::{CfError, Result},
    imputer::{FitDiagnostics, Imputation, Imputer},
    masking::MaskedMatrix,
    types::{constants, ScoreMatrix},
};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the KNN imputer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KnnConfig {
    /// Number of neighbours, `1 <= k < n_subjects`
    pub k: usize,

    /// Similarity measure between subjects
    pub metric: KnnMetric,

    /// Weight neighbours by their (clipped) similarity
    pub weighted: bool,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: constants::DEFAULT_NEIGHBORS,
            metric: KnnMetric::Pearson,
            weighted: true,
        }
    }
}

impl KnnConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of neighbours.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the similarity metric.
    pub fn with_metric(mut self, metric: KnnMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Enables or disables similarity weighting.
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }
}

/// K-nearest-neighbour imputer.
#[derive(Debug, Clone, Default)]
pub struct Knn {
    config: KnnConfig,
}

impl Knn {
    /// Creates a KNN imputer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a KNN imputer with the given configuration.
    pub fn with_config(config: KnnConfig) -> Self {
        Self { config }
    }

    /// Shorthand for a default configuration with `k` neighbours.
    pub fn with_k(k: usize) -> Self {
        Self::with_config(KnnConfig::new().with_k(k))
    }

    /// The active configuration.
    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    fn validate(&self, n_subjects: usize) -> Result<()> {
        let k = self.config.k;
        if k == 0 || k >= n_subjects {
            return Err(CfError::invalid_parameter(
                "k",
                format!("must satisfy 1 <= k < {n_subjects} (number of subjects), got {k}"),
            ));
        }
        Ok(())
    }

    /// Predicts one hidden cell, or `None` when no subject has the item observed.
    fn predict_cell(
        &self,
        matrix: &MaskedMatrix,
        similarity: &ScoreMatrix,
        subject: usize,
        item: usize,
    ) -> Option<f64> {
        let masked = matrix.masked_data();
        let mut candidates: Vec<(usize, f64)> = (0..matrix.n_subjects())
            .filter(|&v| v != subject && matrix.is_observed(v, item))
            .map(|v| (v, similarity[(subject, v)]))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        // Most similar first; ties broken by subject index for determinism
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        candidates.truncate(self.config.k);

        let values = candidates.iter().map(|&(v, _)| masked[(v, item)]);
        let weights: Vec<f64> = candidates.iter().map(|&(_, s)| s.max(0.0)).collect();
        let weight_sum: f64 = weights.iter().sum();

        if self.config.weighted && weight_sum > constants::WEIGHT_EPSILON {
            Some(values.zip(&weights).map(|(r, w)| r * w).sum::<f64>() / weight_sum)
        } else {
            Some(values.sum::<f64>() / candidates.len() as f64)
        }
    }
}

impl Imputer for Knn {
    fn name(&self) -> &str {
        "KNN"
    }

    fn impute(&self, matrix: &MaskedMatrix) -> Result<Imputation> {
        let (n_subjects, n_items) = matrix.shape();
        self.validate(n_subjects)?;

        let similarity = subject_similarity(matrix, self.config.metric);
        debug!(metric = %self.config.metric, k = self.config.k, "computed subject similarity");

        let column_means = column_means_with_fallback(matrix)?;
        let masked = matrix.masked_data();
        let mut predictions = ScoreMatrix::zeros(n_subjects, n_items);
        let mut fallback_cells = 0;

        for subject in 0..n_subjects {
            for item in 0..n_items {
                predictions[(subject, item)] = if matrix.is_observed(subject, item) {
                    masked[(subject, item)]
                } else {
                    match self.predict_cell(matrix, &similarity, subject, item) {
                        Some(value) => value,
                        None => {
                            fallback_cells += 1;
                            column_means[item]
                        }
                    }
                };
            }
        }

        if fallback_cells > 0 {
            warn!(fallback_cells, "cells without usable neighbours were filled with column means");
        }
        info!(
            k = self.config.k,
            metric = %self.config.metric,
            hidden = matrix.n_hidden(),
            "fit knn model"
        );
        Ok(Imputation::new(predictions).with_diagnostics(FitDiagnostics { fallback_cells }))
    }
}
