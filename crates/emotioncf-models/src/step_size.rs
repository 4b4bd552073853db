//! Learning-rate schedules for the SGD factorisation.
//!
//! The step size αₖ used during sweep k over the observed cells:
//!
//! - **Constant**: αₖ = α₀
//! - **Exponential decay**: αₖ = α₀ · γᵏ
//! - **Square root decay**: αₖ = α₀ / √(1 + k)

use emotioncf_core::error::{CfError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Step size schedule across SGD sweeps.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StepSizeSchedule {
    /// Fixed step size for every sweep
    Constant(f64),

    /// Exponential decay: αₖ = α₀ · γᵏ
    ExponentialDecay {
        /// Initial step size α₀
        initial: f64,
        /// Decay factor γ ∈ (0, 1]
        decay_rate: f64,
    },

    /// Square root decay: αₖ = α₀ / √(1 + k)
    SquareRootDecay {
        /// Initial step size α₀
        initial: f64,
    },
}

impl StepSizeSchedule {
    /// Step size for sweep `iteration` (0-based).
    pub fn get_step_size(&self, iteration: usize) -> f64 {
        let k = iteration as f64;
        match *self {
            Self::Constant(alpha) => alpha,
            Self::ExponentialDecay { initial, decay_rate } => initial * decay_rate.powf(k),
            Self::SquareRootDecay { initial } => initial / (1.0 + k).sqrt(),
        }
    }

    /// Creates a constant schedule.
    pub fn constant(step_size: f64) -> Self {
        Self::Constant(step_size)
    }

    /// Creates an exponential decay schedule.
    pub fn exponential_decay(initial: f64, decay_rate: f64) -> Self {
        Self::ExponentialDecay { initial, decay_rate }
    }

    /// Creates a square root decay schedule.
    pub fn sqrt_decay(initial: f64) -> Self {
        Self::SquareRootDecay { initial }
    }

    /// Checks that the schedule produces positive, non-increasing step sizes.
    pub fn validate(&self) -> Result<()> {
        let initial = match *self {
            Self::Constant(alpha) => alpha,
            Self::ExponentialDecay { initial, decay_rate } => {
                if !(decay_rate > 0.0 && decay_rate <= 1.0) {
                    return Err(CfError::invalid_parameter(
                        "decay_rate",
                        format!("must be in (0, 1], got {decay_rate}"),
                    ));
                }
                initial
            }
            Self::SquareRootDecay { initial } => initial,
        };
        if !(initial.is_finite() && initial > 0.0) {
            return Err(CfError::invalid_parameter(
                "learning_rate",
                format!("must be positive, got {initial}"),
            ));
        }
        Ok(())
    }
}
