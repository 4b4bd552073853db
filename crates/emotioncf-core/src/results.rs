//! Scoring predictions over the full, observed and missing partitions.
//!
//! [`summarize`] produces two views of the same scores:
//!
//! - [`UserResults`]: one row per subject, one column per
//!   `(dataset, metric)` pair (3 × 4 = 12 columns);
//! - [`ResultsTable`]: the long-form aggregate table with exactly 24 rows,
//!   `{all, subject} × {full, missing, observed} × {corr, mae, mse, rmse}`.
//!
//! The `all` group pools every cell of a partition; the `subject` group
//! averages the per-subject scores. A subject without cells in a partition
//! gets `NaN` for that partition rather than zero, and the `NaN` carries into
//! the `subject` rows, so any such subject leaves those rows undefined.

use crate::error::{CfError, Result};
use crate::metrics::{mean, Metric};
use crate::types::{format_shape, is_present, BoolMatrix, ScoreMatrix};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Partition of cells a score is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dataset {
    /// Every cell
    Full,
    /// Cells hidden by the effective mask
    Missing,
    /// Cells visible to the model
    Observed,
}

impl Dataset {
    /// All partitions in table order.
    pub const ALL: [Dataset; 3] = [Dataset::Full, Dataset::Missing, Dataset::Observed];

    /// Lower-case name used in the long-form table.
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Full => "full",
            Dataset::Missing => "missing",
            Dataset::Observed => "observed",
        }
    }

    /// Whether a cell with the given mask value belongs to this partition.
    #[inline]
    pub fn contains(&self, observed: bool) -> bool {
        match self {
            Dataset::Full => true,
            Dataset::Missing => !observed,
            Dataset::Observed => observed,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregation level of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Group {
    /// Pooled over all subjects' cells
    All,
    /// Mean of per-subject scores
    Subject,
}

impl Group {
    /// Both groups in table order.
    pub const ALL: [Group; 2] = [Group::All, Group::Subject];

    /// Lower-case name used in the long-form table.
    pub fn name(&self) -> &'static str {
        match self {
            Group::All => "all",
            Group::Subject => "subject",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the long-form results table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultRow {
    /// Name of the algorithm that produced the predictions
    pub algorithm: String,
    /// Partition scored
    pub dataset: Dataset,
    /// Aggregation level
    pub group: Group,
    /// Metric
    pub metric: Metric,
    /// Score, `NaN` when undefined
    pub score: f64,
}

/// Long-form aggregate results.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultsTable {
    rows: Vec<ResultRow>,
}

impl ResultsTable {
    /// Number of rows (always 24 for a summary).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in table order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Iterates over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }

    /// Rows matching a predicate, in table order.
    pub fn filter<F>(&self, predicate: F) -> Vec<&ResultRow>
    where
        F: Fn(&ResultRow) -> bool,
    {
        self.rows.iter().filter(|row| predicate(row)).collect()
    }

    /// Score for one `(metric, dataset, group)` combination.
    pub fn score(&self, metric: Metric, dataset: Dataset, group: Group) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.metric == metric && r.dataset == dataset && r.group == group)
            .map(|r| r.score)
    }

    /// Number of undefined (`NaN`) scores.
    pub fn n_undefined(&self) -> usize {
        self.rows.iter().filter(|r| r.score.is_nan()).count()
    }
}

impl<'a> IntoIterator for &'a ResultsTable {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Per-subject scores, one row per subject and one column per `(dataset, metric)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserResults {
    scores: ScoreMatrix,
    columns: Vec<(Dataset, Metric)>,
}

impl UserResults {
    /// `(subjects, 12)`.
    pub fn shape(&self) -> (usize, usize) {
        self.scores.shape()
    }

    /// Column labels in order.
    pub fn columns(&self) -> &[(Dataset, Metric)] {
        &self.columns
    }

    /// The raw score matrix.
    pub fn scores(&self) -> &ScoreMatrix {
        &self.scores
    }

    /// Per-subject scores for one `(metric, dataset)` column.
    pub fn column(&self, metric: Metric, dataset: Dataset) -> Option<Vec<f64>> {
        let index = self
            .columns
            .iter()
            .position(|&(d, m)| d == dataset && m == metric)?;
        Some(self.scores.column(index).iter().copied().collect())
    }

    /// Score of one subject for one `(metric, dataset)` column.
    pub fn get(&self, subject: usize, metric: Metric, dataset: Dataset) -> Option<f64> {
        let index = self
            .columns
            .iter()
            .position(|&(d, m)| d == dataset && m == metric)?;
        (subject < self.scores.nrows()).then(|| self.scores[(subject, index)])
    }
}

/// Aggregate and per-subject results of one fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    /// 24-row long-form table
    pub overall: ResultsTable,
    /// Per-subject 12-column table
    pub user_results: UserResults,
}

/// Fails unless `mask` and `predictions` have the shape of `data`.
fn check_shapes(data: &ScoreMatrix, mask: &BoolMatrix, predictions: &ScoreMatrix) -> Result<()> {
    for shape in [mask.shape(), predictions.shape()] {
        if shape != data.shape() {
            return Err(CfError::shape_mismatch(
                format_shape(data.shape()),
                format_shape(shape),
            ));
        }
    }
    Ok(())
}

/// `(truth, prediction)` pairs of one partition, optionally restricted to a single row.
///
/// Cells whose ground truth is missing are skipped.
pub fn partition_pairs(
    data: &ScoreMatrix,
    mask: &BoolMatrix,
    predictions: &ScoreMatrix,
    dataset: Dataset,
    row: Option<usize>,
) -> Result<(Vec<f64>, Vec<f64>)> {
    check_shapes(data, mask, predictions)?;
    let rows = match row {
        Some(r) if r >= data.nrows() => {
            return Err(CfError::invalid_parameter(
                "row",
                format!("must be below {}, got {r}", data.nrows()),
            ))
        }
        Some(r) => r..r + 1,
        None => 0..data.nrows(),
    };
    let mut actual = Vec::new();
    let mut predicted = Vec::new();
    for r in rows {
        for c in 0..data.ncols() {
            let truth = data[(r, c)];
            if is_present(truth) && dataset.contains(mask[(r, c)]) {
                actual.push(truth);
                predicted.push(predictions[(r, c)]);
            }
        }
    }
    Ok((actual, predicted))
}

/// Scores predictions against the data over the partitions induced by `mask`.
pub fn summarize(
    algorithm: &str,
    data: &ScoreMatrix,
    mask: &BoolMatrix,
    predictions: &ScoreMatrix,
) -> Result<Summary> {
    check_shapes(data, mask, predictions)?;

    let columns: Vec<(Dataset, Metric)> = Dataset::ALL
        .iter()
        .flat_map(|&d| Metric::ALL.iter().map(move |&m| (d, m)))
        .collect();

    let n_subjects = data.nrows();
    let mut scores = ScoreMatrix::from_element(n_subjects, columns.len(), f64::NAN);
    for subject in 0..n_subjects {
        for (d_idx, dataset) in Dataset::ALL.iter().enumerate() {
            let (actual, predicted) =
                partition_pairs(data, mask, predictions, *dataset, Some(subject))?;
            for (m_idx, metric) in Metric::ALL.iter().enumerate() {
                scores[(subject, d_idx * Metric::ALL.len() + m_idx)] =
                    metric.score(&actual, &predicted);
            }
        }
    }

    let mut rows = Vec::with_capacity(Group::ALL.len() * columns.len());
    for group in Group::ALL {
        for (d_idx, dataset) in Dataset::ALL.iter().enumerate() {
            let pooled = match group {
                Group::All => Some(partition_pairs(data, mask, predictions, *dataset, None)?),
                Group::Subject => None,
            };
            for (m_idx, metric) in Metric::ALL.iter().enumerate() {
                let score = match &pooled {
                    Some((actual, predicted)) => metric.score(actual, predicted),
                    None => mean(
                        scores
                            .column(d_idx * Metric::ALL.len() + m_idx)
                            .iter()
                            .copied(),
                    ),
                };
                rows.push(ResultRow {
                    algorithm: algorithm.to_string(),
                    dataset: *dataset,
                    group,
                    metric: *metric,
                    score,
                });
            }
        }
    }

    Ok(Summary {
        overall: ResultsTable { rows },
        user_results: UserResults { scores, columns },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixture() -> (ScoreMatrix, BoolMatrix, ScoreMatrix) {
        let data = ScoreMatrix::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 2.0, 4.0, 6.0, 8.0]);
        let mask = BoolMatrix::from_row_slice(2, 4, &[true, true, false, false, true, true, true, true]);
        let predictions =
            ScoreMatrix::from_row_slice(2, 4, &[1.0, 2.0, 4.0, 6.0, 2.0, 4.0, 6.0, 8.0]);
        (data, mask, predictions)
    }

    #[test]
    fn test_table_cardinality() {
        let (data, mask, predictions) = fixture();
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();
        assert_eq!(summary.overall.len(), 24);
        assert_eq!(summary.user_results.shape(), (2, 12));
        assert!(summary.overall.iter().all(|r| r.algorithm == "Mean"));
    }

    #[test]
    fn test_row_order() {
        let (data, mask, predictions) = fixture();
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();
        let first = &summary.overall.rows()[0];
        assert_eq!((first.group, first.dataset, first.metric), (Group::All, Dataset::Full, Metric::Corr));
        let last = &summary.overall.rows()[23];
        assert_eq!(
            (last.group, last.dataset, last.metric),
            (Group::Subject, Dataset::Observed, Metric::Rmse)
        );
    }

    #[test]
    fn test_pooled_scores() {
        let (data, mask, predictions) = fixture();
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();
        let table = &summary.overall;
        // Missing cells: (0,2) off by 1, (0,3) off by 2
        assert_relative_eq!(table.score(Metric::Mae, Dataset::Missing, Group::All).unwrap(), 1.5);
        assert_relative_eq!(table.score(Metric::Mse, Dataset::Missing, Group::All).unwrap(), 2.5);
        assert_relative_eq!(table.score(Metric::Mae, Dataset::Observed, Group::All).unwrap(), 0.0);
        assert_relative_eq!(table.score(Metric::Mae, Dataset::Full, Group::All).unwrap(), 3.0 / 8.0);
    }

    #[test]
    fn test_subject_without_missing_cells_is_undefined() {
        let (data, mask, predictions) = fixture();
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();
        let users = &summary.user_results;
        for metric in Metric::ALL {
            assert!(users.get(1, metric, Dataset::Missing).unwrap().is_nan());
        }

        // The undefined subject carries into every subject x missing row
        let table = &summary.overall;
        let undefined = table.filter(|r| r.score.is_nan());
        assert_eq!(undefined.len(), 4);
        assert!(undefined
            .iter()
            .all(|r| r.group == Group::Subject && r.dataset == Dataset::Missing));
        assert_relative_eq!(table.score(Metric::Mae, Dataset::Missing, Group::All).unwrap(), 1.5);
        assert_relative_eq!(table.score(Metric::Mae, Dataset::Full, Group::Subject).unwrap(), 0.375);
    }

    #[test]
    fn test_sparse_truth_leaves_fixed_undefined_count() {
        // Subject 0 hides (0,2) and (0,3), whose truth is missing; subject 1
        // hides (1,1); subject 2 hides nothing.
        let data = ScoreMatrix::from_row_slice(
            3,
            4,
            &[1.0, 2.0, f64::NAN, f64::NAN, 2.0, 4.0, 6.0, 8.0, 3.0, 1.0, 4.0, 1.0],
        );
        let mask = BoolMatrix::from_row_slice(
            3,
            4,
            &[true, true, false, false, true, false, true, true, true, true, true, true],
        );
        let predictions = data.map(|v| if v.is_nan() { 5.0 } else { v + 1.0 });
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();

        let table = &summary.overall;
        // Four subject x missing scores, plus the pooled missing correlation
        // over a single cell
        assert_eq!(table.n_undefined(), 5);
        for metric in Metric::ALL {
            assert!(table.score(metric, Dataset::Missing, Group::Subject).unwrap().is_nan());
        }
        assert!(table.score(Metric::Corr, Dataset::Missing, Group::All).unwrap().is_nan());
        assert_eq!(table.score(Metric::Mae, Dataset::Missing, Group::All), Some(1.0));
        assert_eq!(table.score(Metric::Mae, Dataset::Observed, Group::Subject), Some(1.0));
    }

    #[test]
    fn test_fully_observed_mask_leaves_eight_undefined_scores() {
        let (data, _, predictions) = fixture();
        let mask = BoolMatrix::from_element(2, 4, true);
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();
        assert_eq!(
            summary
                .overall
                .filter(|r| r.dataset == Dataset::Missing && r.score.is_nan())
                .len(),
            8
        );
    }

    #[test]
    fn test_missing_truth_is_skipped() {
        let (mut data, mask, predictions) = fixture();
        data[(0, 3)] = f64::NAN;
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();
        assert_relative_eq!(
            summary.overall.score(Metric::Mae, Dataset::Missing, Group::All).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let (data, mask, _) = fixture();
        let predictions = ScoreMatrix::zeros(2, 3);
        assert!(matches!(
            summarize("Mean", &data, &mask, &predictions),
            Err(CfError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_partition_pairs_rejects_bad_input() {
        let (data, mask, predictions) = fixture();
        let (actual, predicted) =
            partition_pairs(&data, &mask, &predictions, Dataset::Missing, Some(0)).unwrap();
        assert_eq!(actual, vec![3.0, 4.0]);
        assert_eq!(predicted, vec![4.0, 6.0]);

        assert!(matches!(
            partition_pairs(&data, &mask, &predictions, Dataset::Full, Some(2)),
            Err(CfError::InvalidParameter { .. })
        ));
        let short_mask = BoolMatrix::from_element(1, 4, true);
        assert!(matches!(
            partition_pairs(&data, &short_mask, &predictions, Dataset::Full, None),
            Err(CfError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_user_column_lookup() {
        let (data, mask, predictions) = fixture();
        let summary = summarize("Mean", &data, &mask, &predictions).unwrap();
        let observed_mae = summary.user_results.column(Metric::Mae, Dataset::Observed).unwrap();
        assert_eq!(observed_mae, vec![0.0, 0.0]);
        assert_eq!(summary.user_results.columns().len(), 12);
    }
}
