//! Pinned aggregate scores on a deterministic fixture.
//!
//! The fixture has no random masking and every stochastic model is seeded, so the
//! pooled scores must not drift between releases.

use approx::assert_relative_eq;
use emotioncf_core::{
    convergence::TerminationReason,
    masking::Masking,
    metrics::Metric,
    results::{Dataset, Group},
    test_utils::{scattered_mask, wave_data},
};
use emotioncf_models::prelude::*;
use pretty_assertions::assert_eq;

const N_USERS: usize = 12;
const N_ITEMS: usize = 48;

fn fit<A: Imputer>(algorithm: A) -> Model<A> {
    let mut model = Model::with_masking(
        algorithm,
        wave_data(N_USERS, N_ITEMS),
        Masking::Explicit(scattered_mask(N_USERS, N_ITEMS)),
    )
    .unwrap();
    model.fit().unwrap();
    model
}

/// Pooled corr, mae and rmse for the full, missing and observed partitions.
fn pooled_scores<A: Imputer>(model: &Model<A>) -> Vec<f64> {
    let summary = model.summary().unwrap();
    assert_eq!(summary.overall.n_undefined(), 0);
    Dataset::ALL
        .iter()
        .flat_map(|&dataset| {
            [Metric::Corr, Metric::Mae, Metric::Rmse]
                .into_iter()
                .map(move |metric| (dataset, metric))
        })
        .map(|(dataset, metric)| {
            summary
                .overall
                .score(metric, dataset, Group::All)
                .unwrap()
        })
        .collect()
}

fn assert_scores(actual: &[f64], expected: &[f64], epsilon: f64) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_relative_eq!(*a, *e, epsilon = epsilon);
    }
}

fn check_converged<A: Imputer>(model: &Model<A>, max_iterations: usize) {
    let convergence = model.convergence().unwrap();
    assert!(convergence.converged);
    assert_eq!(convergence.termination_reason, TerminationReason::Converged);
    assert_eq!(convergence.n_factors, N_USERS);
    assert!(convergence.iterations < max_iterations);
}

#[test]
fn test_mean_scores_are_stable() {
    let model = fit(Mean::new());
    let expected = [
        0.6992380684242081,
        4.268883543018854,
        7.168732222042365,
        0.33260875485239283,
        8.537767086037707,
        10.138118333433328,
        1.0000000000000002,
        0.0,
        0.0,
    ];
    assert_scores(&pooled_scores(&model), &expected, 1e-9);
}

#[test]
fn test_knn_scores_are_stable() {
    let model = fit(Knn::with_k(3));
    let expected = [
        0.8599090478260076,
        2.9790430720007253,
        5.097653639213184,
        0.7311642693836049,
        5.9580861440014505,
        7.20917091285585,
        1.0000000000000002,
        0.0,
        0.0,
    ];
    assert_scores(&pooled_scores(&model), &expected, 1e-9);
}

#[test]
fn test_nnmf_mult_scores_are_stable() {
    let model = fit(NnmfMult::with_config(
        NnmfMultConfig::new().with_n_iterations(100).with_seed(0),
    ));
    check_converged(&model, 100);
    let expected = [
        0.708940851301519,
        4.484750180622536,
        7.242150282458967,
        0.43748701368427384,
        8.113607010635508,
        10.175889767323865,
        0.9923208501086516,
        0.8558933506095563,
        1.1613564787413124,
    ];
    assert_scores(&pooled_scores(&model), &expected, 1e-6);
}

#[test]
fn test_nnmf_sgd_scores_are_stable() {
    let model = fit(NnmfSgd::with_config(
        NnmfSgdConfig::new().with_n_iterations(100).with_seed(0),
    ));
    check_converged(&model, 100);
    let expected = [
        0.9223382825738398,
        2.657546668088148,
        3.9820957560831176,
        0.8673588689011957,
        4.546240606784263,
        5.500352282717693,
        0.9935332820713882,
        0.7688527293920324,
        1.2084278990624995,
    ];
    assert_scores(&pooled_scores(&model), &expected, 1e-6);
}
