//! Compares the four imputation algorithms on simulated rating time series.
//!
//! Run with: `RUST_LOG=info cargo run --example impute_demo`

use emotioncf::prelude::*;
use emotioncf_core::test_utils::simulate_wide_data;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const N_USERS: usize = 30;
const N_ITEMS: usize = 200;
const SEED: u64 = 2020;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().compact().with_target(false).with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();
}

fn evaluate<A: Imputer>(algorithm: A, data: &ScoreMatrix) -> Result<Summary> {
    let mut model = Model::with_config(
        algorithm,
        data.clone(),
        Masking::Random(NMaskItems::Fraction(0.5)),
        MaskingConfig::new().with_seed(SEED),
    )?;
    model.fit_dilated(2)?;
    if let Some(convergence) = model.convergence() {
        info!(
            iterations = convergence.iterations,
            converged = convergence.converged,
            "learning curve recorded"
        );
    }
    model.summary()
}

fn print_summary(summary: &Summary) {
    for dataset in Dataset::ALL {
        let score = |metric| {
            summary
                .overall
                .score(metric, dataset, Group::All)
                .unwrap_or(f64::NAN)
        };
        println!(
            "  {:<8} corr={:>7.3} mae={:>8.3} rmse={:>8.3}",
            dataset.name(),
            score(Metric::Corr),
            score(Metric::Mae),
            score(Metric::Rmse),
        );
    }
}

fn main() -> Result<()> {
    init_tracing();

    let data = simulate_wide_data(N_USERS, N_ITEMS, SEED);
    info!(subjects = N_USERS, items = N_ITEMS, "simulated data");

    let summaries = vec![
        evaluate(Mean::new(), &data)?,
        evaluate(Knn::with_config(KnnConfig::new().with_k(5)), &data)?,
        evaluate(
            NnmfMult::with_config(NnmfMultConfig::new().with_n_factors(5).with_seed(SEED)),
            &data,
        )?,
        evaluate(
            NnmfSgd::with_config(
                NnmfSgdConfig::new()
                    .with_n_factors(5)
                    .with_n_iterations(500)
                    .with_learning_rate(StepSizeSchedule::exponential_decay(0.005, 0.995))
                    .with_regularization(0.01)
                    .with_seed(SEED),
            ),
            &data,
        )?,
    ];

    for summary in &summaries {
        if let Some(row) = summary.overall.rows().first() {
            println!("{}", row.algorithm);
        }
        print_summary(summary);
    }
    Ok(())
}
