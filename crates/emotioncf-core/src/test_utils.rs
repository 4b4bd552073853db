//! Synthetic fixtures for tests and benchmarks.

#![cfg(any(test, feature = "test-utils"))]

use crate::types::{BoolMatrix, ScoreMatrix};
use rand::prelude::*;
use rand_distr::{Normal, Uniform};

/// Simulates smooth non-negative time series, one per subject.
///
/// Each subject follows a shared slow oscillation with its own phase, gain and
/// offset plus Gaussian noise, clipped at zero. Values fall roughly in `[0, 100]`.
pub fn simulate_wide_data(n_users: usize, n_items: usize, seed: u64) -> ScoreMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let phase = Uniform::new(0.0, std::f64::consts::TAU);
    let gain = Uniform::new(10.0, 30.0);
    let offset = Uniform::new(40.0, 60.0);
    let noise = Normal::new(0.0, 2.0).expect("valid normal parameters");

    let params: Vec<(f64, f64, f64)> = (0..n_users)
        .map(|_| (phase.sample(&mut rng), gain.sample(&mut rng), offset.sample(&mut rng)))
        .collect();

    let mut data = ScoreMatrix::zeros(n_users, n_items);
    for (user, &(phi, g, o)) in params.iter().enumerate() {
        for item in 0..n_items {
            let t = item as f64 / n_items.max(1) as f64;
            let value = o + g * (std::f64::consts::TAU * 2.0 * t + phi).sin() + noise.sample(&mut rng);
            data[(user, item)] = value.max(0.0);
        }
    }
    data
}

/// Simulates an exactly low-rank non-negative matrix `U · V`.
pub fn simulate_low_rank(n_users: usize, n_items: usize, rank: usize, seed: u64) -> ScoreMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(0.0, 3.0);
    let user = ScoreMatrix::from_fn(n_users, rank, |_, _| dist.sample(&mut rng));
    let item = ScoreMatrix::from_fn(rank, n_items, |_, _| dist.sample(&mut rng));
    user * item
}

/// Deterministic wave data with no random draws.
///
/// Subjects share a two-cycle oscillation in one of three phase groups, with
/// one of five gains, plus a fast ripple. Values stay within `[25, 75]`.
pub fn wave_data(n_users: usize, n_items: usize) -> ScoreMatrix {
    ScoreMatrix::from_fn(n_users, n_items, |r, c| {
        let gain = 10.0 + 2.0 * (r % 5) as f64;
        let phase = 1.3 * (r % 3) as f64;
        let slow = (std::f64::consts::TAU * 2.0 * c as f64 / n_items as f64 + phase).sin();
        let ripple = (1.7 * c as f64 + 0.9 * r as f64).sin();
        50.0 + gain * slow + 3.0 * ripple
    })
}

/// Deterministic mask hiding the cells where `(37 col + 11 row) mod n_items < n_items / 2`.
///
/// Hides exactly half of every row when `n_items` is even and coprime with 37.
pub fn scattered_mask(n_users: usize, n_items: usize) -> BoolMatrix {
    BoolMatrix::from_fn(n_users, n_items, |r, c| {
        (37 * c + 11 * r) % n_items >= n_items / 2
    })
}

/// Deterministic mask hiding every cell where `(row + col) % period == 0`.
pub fn striped_mask(n_users: usize, n_items: usize, period: usize) -> BoolMatrix {
    BoolMatrix::from_fn(n_users, n_items, |r, c| (r + c) % period != 0)
}
