//! Subject-to-subject similarity over co-observed items.
//!
//! Two subjects are compared only on the items both have observed. Pairs
//! with no usable overlap get a similarity of zero, which the KNN model
//! treats as "no evidence" rather than as dissimilarity.

use emotioncf_core::{
    error::{CfError, Result},
    masking::MaskedMatrix,
    metrics::pearson,
    types::{is_present, ScoreMatrix},
};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Similarity measure between two subjects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum KnnMetric {
    /// Pearson correlation of the co-observed values
    #[default]
    Pearson,
    /// Cosine of the angle between the co-observed value vectors
    Cosine,
    /// `1 / (1 + d)` where `d` is the Euclidean distance over co-observed items
    Euclidean,
}

impl KnnMetric {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pearson => "pearson",
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }

    /// Similarity of two equally long value slices.
    ///
    /// Returns zero whenever the measure is undefined (too few values, zero
    /// variance or zero norm).
    pub fn similarity(&self, x: &[f64], y: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), y.len());
        if x.is_empty() {
            return 0.0;
        }
        let value = match self {
            Self::Pearson => pearson(x, y),
            Self::Cosine => {
                let dot: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
                let norm_x = x.iter().map(|a| a * a).sum::<f64>().sqrt();
                let norm_y = y.iter().map(|b| b * b).sum::<f64>().sqrt();
                dot / (norm_x * norm_y)
            }
            Self::Euclidean => {
                let distance = x
                    .iter()
                    .zip(y)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                1.0 / (1.0 + distance)
            }
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

impl fmt::Display for KnnMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnnMetric {
    type Err = CfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" | "correlation" => Ok(Self::Pearson),
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(CfError::invalid_parameter(
                "metric",
                format!("unknown similarity metric '{other}'"),
            )),
        }
    }
}

/// Symmetric subjects × subjects similarity matrix with a zero diagonal.
pub fn subject_similarity(matrix: &MaskedMatrix, metric: KnnMetric) -> ScoreMatrix {
    let masked = matrix.masked_data();
    let n_subjects = masked.nrows();
    let mut similarity = ScoreMatrix::zeros(n_subjects, n_subjects);
    let mut xs = Vec::with_capacity(masked.ncols());
    let mut ys = Vec::with_capacity(masked.ncols());

    for u in 0..n_subjects {
        for v in (u + 1)..n_subjects {
            xs.clear();
            ys.clear();
            for (a, b) in masked.row(u).iter().zip(masked.row(v).iter()) {
                if is_present(*a) && is_present(*b) {
                    xs.push(*a);
                    ys.push(*b);
                }
            }
            let s = metric.similarity(&xs, &ys);
            similarity[(u, v)] = s;
            similarity[(v, u)] = s;
        }
    }
    similarity
}
