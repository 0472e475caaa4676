//! Criterion benchmarks for the analysis hot path in `ab-core`.
//!
//! Everything runs on the built-in reference experiment so results are
//! deterministic across machines.

use ab_config::{BernoulliExponentialSample, BinomialObservation, ExperimentConfig};
use ab_core::analysis::{analyze, AnalysisOptions};
use ab_core::inference::{expected_loss, update_beta, BetaPosterior, CompoundPrior, NormalPosterior};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_expected_loss(c: &mut Criterion) {
    let beta_a = BetaPosterior::new(255.0, 1030.0).expect("valid beta");
    let beta_b = BetaPosterior::new(290.0, 1033.0).expect("valid beta");
    let normal_a = NormalPosterior::new(45.28, 0.366).expect("valid normal");
    let normal_b = NormalPosterior::new(46.23, 0.353).expect("valid normal");

    let mut group = c.benchmark_group("expected_loss");
    for nodes in [8usize, 24, 64] {
        group.bench_with_input(BenchmarkId::new("beta", nodes), &nodes, |b, &n| {
            b.iter(|| expected_loss(black_box(&beta_a), black_box(&beta_b), n).expect("risk"))
        });
        group.bench_with_input(BenchmarkId::new("normal", nodes), &nodes, |b, &n| {
            b.iter(|| expected_loss(black_box(&normal_a), black_box(&normal_b), n).expect("risk"))
        });
    }
    group.finish();
}

fn bench_updates(c: &mut Criterion) {
    let prior = BetaPosterior::new(1.0, 1.0).expect("valid beta");
    let obs = BinomialObservation {
        successes: 254,
        trials: 1283,
    };
    c.bench_function("update_beta", |b| {
        b.iter(|| update_beta(black_box(prior), black_box(&obs)).expect("update"))
    });

    let compound = CompoundPrior::reference().expect("reference prior");
    let sample = BernoulliExponentialSample {
        indicators: (0..2_000).map(|i| u8::from(i % 5 == 0)).collect(),
        magnitudes: (0..2_000).map(|i| 50.0 + (i % 97) as f64).collect(),
    };
    c.bench_function("compound_fit_2000", |b| {
        b.iter(|| compound.fit(black_box(&sample)).expect("fit"))
    });
}

fn bench_analyze(c: &mut Criterion) {
    let config = ExperimentConfig::default();
    let options = AnalysisOptions::default();
    c.bench_function("analyze_reference", |b| {
        b.iter(|| analyze(black_box(&config), black_box(&options)).expect("analysis"))
    });
}

criterion_group!(benches, bench_expected_loss, bench_updates, bench_analyze);
criterion_main!(benches);
