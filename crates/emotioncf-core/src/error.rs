//! Error types for masking, fitting and scoring.
//!
//! Only caller mistakes are errors. Numerical conditions such as an NMF run
//! that exhausts its iteration budget, or a KNN cell without usable
//! neighbours, are recorded in model state instead.

use thiserror::Error;

/// Errors raised by the collaborative-filtering toolkit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CfError {
    /// `fit` (or dilation) was requested before any masking was configured.
    ///
    /// Without held-out entries there is nothing to evaluate predictions against.
    #[error("Data is not masked: {operation} requires a mask or n_mask_items")]
    NotMasked {
        /// Operation that was attempted
        operation: String,
    },

    /// Results were requested from a model that has not been fit.
    #[error("Model is not fit: call fit() before {operation}")]
    NotFit {
        /// Operation that was attempted
        operation: String,
    },

    /// A matrix does not have the shape of the data it must align with.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape
        expected: String,
        /// Actual shape
        actual: String,
    },

    /// A hyperparameter or argument is outside its valid range.
    #[error("Invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        parameter: String,
        /// Description of the constraint that was violated
        reason: String,
    },
}

impl CfError {
    /// Create a NotMasked error for the given operation.
    pub fn not_masked<S: Into<String>>(operation: S) -> Self {
        Self::NotMasked {
            operation: operation.into(),
        }
    }

    /// Create a NotFit error for the given operation.
    pub fn not_fit<S: Into<String>>(operation: S) -> Self {
        Self::NotFit {
            operation: operation.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter<S1, S2>(parameter: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, CfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CfError::not_masked("fit");
        assert!(matches!(err, CfError::NotMasked { .. }));
        assert_eq!(
            err.to_string(),
            "Data is not masked: fit requires a mask or n_mask_items"
        );

        let err = CfError::shape_mismatch("(3, 4)", "(4, 3)");
        assert_eq!(err.to_string(), "Shape mismatch: expected (3, 4), got (4, 3)");
    }

    #[test]
    fn test_invalid_parameter_context() {
        let err = CfError::invalid_parameter("k", "must be smaller than the number of subjects");
        if let CfError::InvalidParameter { parameter, reason } = err {
            assert_eq!(parameter, "k");
            assert!(reason.contains("smaller"));
        } else {
            panic!("Expected InvalidParameter variant");
        }
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            CfError::not_masked("dilate_mask"),
            CfError::not_fit("summary"),
            CfError::shape_mismatch("(1, 1)", "(2, 2)"),
            CfError::invalid_parameter("n_factors", "must be positive"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
