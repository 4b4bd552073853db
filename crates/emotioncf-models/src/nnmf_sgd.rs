//! Non-negative matrix factorisation by stochastic gradient descent.
//!
//! Each observed rating is modelled as
//!
//! ```text
//! r̂(u, i) = μ + b_u + b_i + Σ_f P(u, f) · Q(f, i)
//! ```
//!
//! where `μ` is the observed mean and the bias terms are optional. One
//! iteration is a full sweep over the observed cells in shuffled order; after
//! every per-cell gradient step the factors are projected back onto the
//! non-negative orthant. The loss recorded per iteration is the masked mean
//! squared error of the whole model.

use crate::factorization::{ensure_non_negative, finalize_predictions, init_half_normal, FactorHeuristic};
use crate::step_size::StepSizeSchedule;
use crate::utils::{global_observed_mean, masked_mse, seeded_rng};
use emotioncf_core::{
    convergence::{Convergence, ConvergenceChecker, StoppingCriterion, TerminationReason},
    error::{CfError, Result},
    imputer::{Factors, Imputation, Imputer},
    masking::MaskedMatrix,
    types::{constants, DVector, ScoreMatrix},
};
use rand::seq::SliceRandom;
use std::time::Instant;
use tracing::{info, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the SGD factorisation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NnmfSgdConfig {
    /// How the number of latent factors is chosen
    pub n_factors: FactorHeuristic,

    /// Maximum number of sweeps over the observed cells
    pub n_iterations: usize,

    /// Loss change, relative to the first loss, below which the fit is considered converged
    pub tolerance: f64,

    /// Learning-rate schedule across sweeps
    pub learning_rate: StepSizeSchedule,

    /// L2 penalty on the user factors
    pub user_regularization: f64,

    /// L2 penalty on the item factors
    pub item_regularization: f64,

    /// L2 penalty on the user and item biases
    pub bias_regularization: f64,

    /// Learn global, user and item bias terms
    pub with_biases: bool,

    /// Shuffle the observed cells before every sweep
    pub shuffle: bool,

    /// Seed for initialisation and shuffling (None = system entropy)
    pub seed: Option<u64>,

    /// Clamp predictions to the observed data range
    pub clip: bool,
}

impl Default for NnmfSgdConfig {
    fn default() -> Self {
        Self {
            n_factors: FactorHeuristic::MinDimension,
            n_iterations: constants::DEFAULT_MAX_ITERATIONS,
            tolerance: constants::DEFAULT_TOLERANCE,
            learning_rate: StepSizeSchedule::Constant(constants::DEFAULT_LEARNING_RATE),
            user_regularization: 0.0,
            item_regularization: 0.0,
            bias_regularization: 0.0,
            with_biases: true,
            shuffle: true,
            seed: None,
            clip: true,
        }
    }
}

impl NnmfSgdConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the factor-count rule.
    pub fn with_n_factors(mut self, n_factors: impl Into<FactorHeuristic>) -> Self {
        self.n_factors = n_factors.into();
        self
    }

    /// Sets the maximum number of sweeps.
    pub fn with_n_iterations(mut self, n_iterations: usize) -> Self {
        self.n_iterations = n_iterations;
        self
    }

    /// Sets the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the learning-rate schedule.
    pub fn with_learning_rate(mut self, schedule: StepSizeSchedule) -> Self {
        self.learning_rate = schedule;
        self
    }

    /// Sets a constant learning rate.
    pub fn with_constant_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = StepSizeSchedule::Constant(learning_rate);
        self
    }

    /// Sets the same L2 penalty on user and item factors.
    pub fn with_regularization(mut self, penalty: f64) -> Self {
        self.user_regularization = penalty;
        self.item_regularization = penalty;
        self
    }

    /// Sets the L2 penalty on the bias terms.
    pub fn with_bias_regularization(mut self, penalty: f64) -> Self {
        self.bias_regularization = penalty;
        self
    }

    /// Enables or disables the bias terms.
    pub fn with_biases(mut self, with_biases: bool) -> Self {
        self.with_biases = with_biases;
        self
    }

    /// Enables or disables shuffling between sweeps.
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Sets the seed.
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
        for (name, value) in [
            ("user_regularization", self.user_regularization),
            ("item_regularization", self.item_regularization),
            ("bias_regularization", self.bias_regularization),
        ] {
            if !(value >= 0.0) {
                return Err(CfError::invalid_parameter(
                    name,
                    format!("must be non-negative, got {value}"),
                ));
            }
        }
        self.learning_rate.validate()
    }
}

/// Learned parameters of the SGD model.
#[derive(Debug, Clone)]
struct SgdState {
    user: ScoreMatrix,
    item: ScoreMatrix,
    user_bias: DVector<f64>,
    item_bias: DVector<f64>,
    global_mean: f64,
}

impl SgdState {
    fn predict_cell(&self, u: usize, i: usize) -> f64 {
        let dot: f64 = (0..self.user.ncols())
            .map(|f| self.user[(u, f)] * self.item[(f, i)])
            .sum();
        self.global_mean + self.user_bias[u] + self.item_bias[i] + dot
    }

    fn predict(&self) -> ScoreMatrix {
        let mut predictions = &self.user * &self.item;
        for i in 0..predictions.ncols() {
            for u in 0..predictions.nrows() {
                predictions[(u, i)] += self.global_mean + self.user_bias[u] + self.item_bias[i];
            }
        }
        predictions
    }
}

/// NMF fit by per-cell stochastic gradient steps.
#[derive(Debug, Clone, Default)]
pub struct NnmfSgd {
    config: NnmfSgdConfig,
}

impl NnmfSgd {
    /// Creates the model with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the model with the given configuration.
    pub fn with_config(config: NnmfSgdConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &NnmfSgdConfig {
        &self.config
    }

    /// One sweep of gradient steps over `cells` with step size `alpha`.
    fn sweep(&self, state: &mut SgdState, data: &ScoreMatrix, cells: &[(usize, usize)], alpha: f64) {
        let c = &self.config;
        let n_factors = state.user.ncols();

        for &(u, i) in cells {
            let error = data[(u, i)] - state.predict_cell(u, i);

            if c.with_biases {
                state.user_bias[u] += alpha * (error - c.bias_regularization * state.user_bias[u]);
                state.item_bias[i] += alpha * (error - c.bias_regularization * state.item_bias[i]);
            }

            for f in 0..n_factors {
                let p = state.user[(u, f)];
                let q = state.item[(f, i)];
                state.user[(u, f)] = (p + alpha * (error * q - c.user_regularization * p)).max(0.0);
                state.item[(f, i)] = (q + alpha * (error * p - c.item_regularization * q)).max(0.0);
            }
        }
    }
}

impl Imputer for NnmfSgd {
    fn name(&self) -> &str {
        "NNMF_sgd"
    }

    fn impute(&self, matrix: &MaskedMatrix) -> Result<Imputation> {
        self.config.validate()?;
        ensure_non_negative(matrix)?;
        let n_factors = self.config.n_factors.resolve(matrix)?;
        let (n_subjects, n_items) = matrix.shape();

        let data = matrix.masked_data_filled();
        let weights = matrix.observed_weights();
        let mut cells = matrix.observed_cells();

        let mut rng = seeded_rng(self.config.seed);
        let (user, item) = init_half_normal(&mut rng, n_subjects, n_items, n_factors)?;
        let global_mean = if self.config.with_biases {
            global_observed_mean(matrix)?
        } else {
            0.0
        };
        let mut state = SgdState {
            user,
            item,
            user_bias: DVector::zeros(n_subjects),
            item_bias: DVector::zeros(n_items),
            global_mean,
        };

        let criterion = self.config.stopping_criterion();
        let mut losses = Vec::new();
        let start = Instant::now();

        let reason = loop {
            let previous = state.clone();
            if self.config.shuffle {
                cells.shuffle(&mut rng);
            }
            let alpha = self.config.learning_rate.get_step_size(losses.len());
            self.sweep(&mut state, &data, &cells, alpha);

            let loss = masked_mse(&data, &state.predict(), &weights);
            trace!(iteration = losses.len(), loss, alpha, "nnmf_sgd sweep");
            losses.push(loss);

            if let Some(reason) = ConvergenceChecker::check(&losses, &criterion) {
                if reason == TerminationReason::NumericalError {
                    // Keep the last finite parameters so predictions stay total
                    state = previous;
                }
                break reason;
            }
        };

        let convergence = Convergence::new(losses, n_factors, reason, start.elapsed());
        match reason {
            TerminationReason::Converged => {}
            TerminationReason::NumericalError => warn!(
                iterations = convergence.iterations,
                "nnmf_sgd diverged; keeping the last finite factors"
            ),
            TerminationReason::MaxIterations => warn!(
                iterations = convergence.iterations,
                "nnmf_sgd stopped before reaching the tolerance"
            ),
        }
        info!(
            iterations = convergence.iterations,
            n_factors,
            final_loss = convergence.final_loss(),
            converged = convergence.converged,
            "fit nnmf_sgd model"
        );

        let predictions = finalize_predictions(state.predict(), matrix, self.config.clip);
        let factors = Factors {
            user: state.user,
            item: state.item,
        };
        Ok(Imputation::new(predictions)
            .with_convergence(convergence)
            .with_factors(factors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotioncf_core::masking::{Masking, MaskingConfig, NMaskItems};
    use emotioncf_core::test_utils::simulate_low_rank;

    fn masked_low_rank(seed: u64) -> MaskedMatrix {
        MaskedMatrix::with_masking(
            simulate_low_rank(6, 15, 2, seed),
            Masking::Random(NMaskItems::Fraction(0.2)),
            MaskingConfig::new().with_seed(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_loss_decreases_over_training() {
        let matrix = masked_low_rank(2);
        let model = NnmfSgd::with_config(
            NnmfSgdConfig::new()
                .with_n_factors(2)
                .with_n_iterations(300)
                .with_tolerance(0.0)
                .with_constant_learning_rate(0.01)
                .with_seed(5),
        );
        let imputation = model.impute(&matrix).unwrap();
        let curve = imputation.convergence.as_ref().unwrap().learning_curve();
        assert_eq!(curve.len(), 300);
        assert!(curve[curve.len() - 1] < curve[0]);
        assert!(imputation.is_total());
        let factors = imputation.factors.unwrap();
        assert!(factors.user.iter().chain(factors.item.iter()).all(|&x| x >= 0.0));
    }

    #[test]
    fn test_seed_reproduces_fit_exactly() {
        let matrix = masked_low_rank(4);
        let config = NnmfSgdConfig::new()
            .with_n_factors(3)
            .with_n_iterations(25)
            .with_constant_learning_rate(0.005)
            .with_regularization(0.01)
            .with_seed(99);
        let a = NnmfSgd::with_config(config.clone()).impute(&matrix).unwrap();
        let b = NnmfSgd::with_config(config).impute(&matrix).unwrap();
        assert_eq!(a.predictions, b.predictions);
        assert_eq!(a.convergence.unwrap().losses, b.convergence.unwrap().losses);
    }

    #[test]
    fn test_divergence_is_a_state_not_an_error() {
        let matrix = masked_low_rank(6);
        let model = NnmfSgd::with_config(
            NnmfSgdConfig::new()
                .with_n_factors(2)
                .with_n_iterations(200)
                .with_constant_learning_rate(1e6)
                .with_seed(1),
        );
        let imputation = model.impute(&matrix).unwrap();
        let convergence = imputation.convergence.as_ref().unwrap();
        assert_eq!(convergence.termination_reason, TerminationReason::NumericalError);
        assert!(!convergence.converged);
        assert!(imputation.is_total());
    }

    #[test]
    fn test_without_biases_or_shuffle() {
        let matrix = masked_low_rank(8);
        let model = NnmfSgd::with_config(
            NnmfSgdConfig::new()
                .with_n_factors(2)
                .with_n_iterations(10)
                .with_biases(false)
                .with_shuffle(false)
                .with_seed(3),
        );
        let imputation = model.impute(&matrix).unwrap();
        assert_eq!(imputation.predictions.shape(), (6, 15));
        assert!(imputation.is_total());
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let matrix = masked_low_rank(1);
        let bad_rate = NnmfSgd::with_config(NnmfSgdConfig::new().with_constant_learning_rate(-1.0));
        assert!(bad_rate.impute(&matrix).is_err());
        let bad_penalty = NnmfSgd::with_config(NnmfSgdConfig::new().with_regularization(-0.1));
        assert!(bad_penalty.impute(&matrix).is_err());
    }
}
