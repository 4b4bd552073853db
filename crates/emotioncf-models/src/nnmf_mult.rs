//! Non-negative matrix factorisation with masked multiplicative updates.
//!
//! The observed cells of `X` are approximated by `U · V` with `U ≥ 0`
//! (subjects × factors) and `V ≥ 0` (factors × items). With `W` the 0/1
//! weight matrix of observed cells, every iteration applies the Lee–Seung
//! updates restricted to observed cells:
//!
//! ```text
//! U ← U ∘ ((W ∘ X) Vᵀ) ⊘ ((W ∘ UV) Vᵀ + ε)
//! V ← V ∘ (Uᵀ (W ∘ X)) ⊘ (Uᵀ (W ∘ UV) + ε)
//! ```
//!
//! These keep the masked squared error non-increasing, so the loop stops on
//! a small relative change of the loss or when the iteration budget runs out.

use crate::factorization::{ensure_non_negative, finalize_predictions, init_uniform, FactorHeuristic};
use crate::utils::{global_observed_mean, masked_mse, seeded_rng};
use emotioncf_core::{
    convergence::{Convergence, ConvergenceChecker, StoppingCriterion, TerminationReason},
    error::{CfError, Result},
    imputer::{Factors, Imputation, Imputer},
    masking::MaskedMatrix,
    types::{constants, ScoreMatrix},
};
use std::time::Instant;
use tracing::{info, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the multiplicative-update NMF.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NnmfMultConfig {
    /// How the number of latent factors is chosen
    pub n_factors: FactorHeuristic,

    /// Maximum number of update iterations
    pub n_iterations: usize,

    /// Loss change, relative to the first loss, below which the fit is considered converged
    pub tolerance: f64,

    /// Added to update denominators to avoid division by zero
    pub epsilon: f64,

    /// Seed for factor initialisation (None = system entropy)
    pub seed: Option<u64>,

    /// Clamp predictions to the observed data range
    pub clip: bool,
}

impl Default for NnmfMultConfig {
    fn default() -> Self {
        Self {
            n_factors: FactorHeuristic::MinDimension,
            n_iterations: constants::DEFAULT_MAX_ITERATIONS,
            tolerance: constants::DEFAULT_TOLERANCE,
            epsilon: constants::DEFAULT_EPSILON,
            seed: None,
            clip: true,
        }
    }
}

impl NnmfMultConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the factor-count rule.
    pub fn with_n_factors(mut self, n_factors: impl Into<FactorHeuristic>) -> Self {
        self.n_factors = n_factors.into();
        self
    }

    /// Sets the maximum number of iterations.
    pub fn with_n_iterations(mut self, n_iterations: usize) -> Self {
        self.n_iterations = n_iterations;
        self
    }

    /// Sets the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the denominator guard.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the initialisation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables clipping of predictions.
    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    fn stopping_criterion(&self) -> StoppingCriterion {
        StoppingCriterion::new()
            .with_max_iterations(self.n_iterations)
            .with_tolerance(self.tolerance)
    }

    fn validate(&self) -> Result<()> {
        if self.n_iterations == 0 {
            return Err(CfError::invalid_parameter("n_iterations", "must be at least 1"));
        }
        if !(self.tolerance >= 0.0) {
            return Err(CfError::invalid_parameter(
                "tolerance",
                format!("must be non-negative, got {}", self.tolerance),
            ));
        }
        if !(self.epsilon > 0.0) {
            return Err(CfError::invalid_parameter(
                "epsilon",
                format!("must be positive, got {}", self.epsilon),
            ));
        }
        Ok(())
    }
}

/// NMF fit by masked multiplicative updates.
#[derive(Debug, Clone, Default)]
pub struct NnmfMult {
    config: NnmfMultConfig,
}

impl NnmfMult {
    /// Creates the model with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the model with the given configuration.
    pub fn with_config(config: NnmfMultConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &NnmfMultConfig {
        &self.config
    }

    /// One pass of the masked update rules, `U` first.
    fn update(&self, user: &mut ScoreMatrix, item: &mut ScoreMatrix, wx: &ScoreMatrix, weights: &ScoreMatrix) {
        let eps = self.config.epsilon;

        let wuv = (&*user * &*item).component_mul(weights);
        let numerator = wx * item.transpose();
        let denominator = wuv * item.transpose();
        user.zip_zip_apply(&numerator, &denominator, |u, n, d| *u *= n / (d + eps));

        let wuv = (&*user * &*item).component_mul(weights);
        let numerator = user.transpose() * wx;
        let denominator = user.transpose() * wuv;
        item.zip_zip_apply(&numerator, &denominator, |v, n, d| *v *= n / (d + eps));
    }
}

impl Imputer for NnmfMult {
    fn name(&self) -> &str {
        "NNMF_mult"
    }

    fn impute(&self, matrix: &MaskedMatrix) -> Result<Imputation> {
        self.config.validate()?;
        ensure_non_negative(matrix)?;
        let n_factors = self.config.n_factors.resolve(matrix)?;
        let (n_subjects, n_items) = matrix.shape();

        let target = matrix.masked_data_filled();
        let weights = matrix.observed_weights();
        let wx = target.component_mul(&weights);

        let mut rng = seeded_rng(self.config.seed);
        let mean = global_observed_mean(matrix)?;
        let (mut user, mut item) = init_uniform(&mut rng, n_subjects, n_items, n_factors, mean);

        let criterion = self.config.stopping_criterion();
        let mut losses = Vec::new();
        let start = Instant::now();

        let reason = loop {
            self.update(&mut user, &mut item, &wx, &weights);
            let loss = masked_mse(&target, &(&user * &item), &weights);
            trace!(iteration = losses.len(), loss, "nnmf_mult iteration");
            losses.push(loss);
            if let Some(reason) = ConvergenceChecker::check(&losses, &criterion) {
                break reason;
            }
        };

        let convergence = Convergence::new(losses, n_factors, reason, start.elapsed());
        if reason != TerminationReason::Converged {
            warn!(
                iterations = convergence.iterations,
                ?reason,
                "nnmf_mult stopped before reaching the tolerance"
            );
        }
        info!(
            iterations = convergence.iterations,
            n_factors,
            final_loss = convergence.final_loss(),
            converged = convergence.converged,
            "fit nnmf_mult model"
        );

        let factors = Factors { user, item };
        let predictions = finalize_predictions(factors.reconstruct(), matrix, self.config.clip);
        Ok(Imputation::new(predictions)
            .with_convergence(convergence)
            .with_factors(factors))
    }
}
