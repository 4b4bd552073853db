//! Convergence tracking for the iterative factorisation models.
//!
//! Both NMF variants record the training loss after every iteration and stop
//! either when the latest change of the loss, measured against the first
//! recorded loss, falls below a tolerance or when the iteration budget is
//! exhausted. Running out of iterations is a state,
//! not an error: callers inspect [`Convergence::converged`] and decide what
//! to do.
//!
//! # Termination
//!
//! - **Converged**: `|loss_{k-1} - loss_k| / loss_1 < tolerance`
//! - **MaxIterations**: `k == max_iterations` without meeting the tolerance
//! - **NumericalError**: the loss became non-finite (e.g. a diverging
//!   learning rate)

use crate::types::constants;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why an iterative fit stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// Relative loss improvement fell below the tolerance
    Converged,
    /// Iteration budget exhausted before meeting the tolerance
    MaxIterations,
    /// Loss became NaN or infinite
    NumericalError,
}

/// Stopping rules for an iterative fit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoppingCriterion {
    /// Hard cap on the number of iterations
    pub max_iterations: usize,

    /// Tolerance on the change of the loss between iterations, relative to the first loss
    pub tolerance: f64,
}

impl Default for StoppingCriterion {
    fn default() -> Self {
        Self {
            max_iterations: constants::DEFAULT_MAX_ITERATIONS,
            tolerance: constants::DEFAULT_TOLERANCE,
        }
    }
}

impl StoppingCriterion {
    /// Creates a criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the loss-change tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Decides whether an iterative fit should stop after the latest loss.
pub struct ConvergenceChecker;

impl ConvergenceChecker {
    /// Checks the stopping rules against the loss history.
    ///
    /// `losses` holds one entry per completed iteration, the newest last.
    /// Returns the termination reason if the fit should stop, otherwise `None`.
    pub fn check(losses: &[f64], criterion: &StoppingCriterion) -> Option<TerminationReason> {
        let current = *losses.last()?;

        if !current.is_finite() {
            return Some(TerminationReason::NumericalError);
        }

        if losses.len() >= 2 {
            let previous = losses[losses.len() - 2];
            if relative_change(losses[0], previous, current) < criterion.tolerance {
                return Some(TerminationReason::Converged);
            }
        }

        if losses.len() >= criterion.max_iterations {
            return Some(TerminationReason::MaxIterations);
        }

        None
    }
}

/// Change between two successive losses, scaled by the `initial` loss.
///
/// An initial loss of exactly zero leaves the absolute change.
pub fn relative_change(initial: f64, previous: f64, current: f64) -> f64 {
    let delta = (previous - current).abs();
    if initial.abs() > 0.0 {
        delta / initial.abs()
    } else {
        delta
    }
}

/// Outcome of one iterative fit: the learning curve plus termination metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Convergence {
    /// Training loss (masked mean squared error) after each iteration
    pub losses: Vec<f64>,

    /// Number of iterations performed
    pub iterations: usize,

    /// Number of latent factors used by the fit
    pub n_factors: usize,

    /// Why the fit stopped
    pub termination_reason: TerminationReason,

    /// True only if the tolerance was met before the iteration cap
    pub converged: bool,

    /// Wall-clock time spent iterating
    #[cfg_attr(feature = "serde", serde(skip))]
    pub duration: Duration,
}

impl Convergence {
    /// Creates a convergence record from a finished loss history.
    pub fn new(
        losses: Vec<f64>,
        n_factors: usize,
        termination_reason: TerminationReason,
        duration: Duration,
    ) -> Self {
        let converged = termination_reason == TerminationReason::Converged;
        Self {
            iterations: losses.len(),
            losses,
            n_factors,
            termination_reason,
            converged,
            duration,
        }
    }

    /// Loss after the last iteration, if any iteration ran.
    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }

    /// The per-iteration loss sequence, for plotting learning curves.
    pub fn learning_curve(&self) -> &[f64] {
        &self.losses
    }
}
