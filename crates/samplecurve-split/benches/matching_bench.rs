//! Criterion benchmarks for samplecurve-split: random, balanced and matched splits.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use samplecurve_split::{SamplingPolicy, SplitConfig, SplitInputs};

fn make_population(
    n_samples: usize,
    n_features: usize,
    case_rate: f64,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<f64>, Vec<Vec<f64>>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut targets = Vec::with_capacity(n_samples);
    let mut matching = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let case = rng.r#gen::<f64>() < case_rate;
        targets.push(if case { 1.0 } else { 0.0 });
        features.push((0..n_features).map(|_| rng.r#gen::<f64>()).collect());
        let age = 40.0 + rng.r#gen::<f64>() * 30.0 + if case { 5.0 } else { 0.0 };
        let sex = if rng.r#gen::<bool>() { 1.0 } else { 0.0 };
        matching.push(vec![age, sex]);
    }
    (features, targets, matching)
}

fn bench_random_split(c: &mut Criterion) {
    let (features, targets, _) = make_population(20_000, 16, 0.3, 42);
    let inputs = SplitInputs::new(&features, &targets).unwrap();
    let cfg = SplitConfig::new(5000, 1000, 1000)
        .unwrap()
        .with_stratify(true)
        .with_seed(42);

    c.bench_function("split_none_stratified_20000rows_n5000", |b| {
        b.iter(|| cfg.generate(&inputs).unwrap());
    });
}

fn bench_balanced_split(c: &mut Criterion) {
    let (features, targets, _) = make_population(20_000, 16, 0.1, 42);
    let inputs = SplitInputs::new(&features, &targets).unwrap();
    let cfg = SplitConfig::new(2000, 400, 400)
        .unwrap()
        .with_policy(SamplingPolicy::Balanced)
        .with_seed(42);

    c.bench_function("split_balanced_20000rows_n2000", |b| {
        b.iter(|| cfg.generate(&inputs).unwrap());
    });
}

fn bench_matched_split(c: &mut Criterion) {
    let (features, targets, matching) = make_population(5000, 16, 0.1, 42);
    let inputs = SplitInputs::new(&features, &targets)
        .unwrap()
        .with_matching(&matching);
    let cfg = SplitConfig::new(400, 100, 100)
        .unwrap()
        .with_policy(SamplingPolicy::Matched)
        .with_seed(42);

    c.bench_function("split_matched_5000rows_n400", |b| {
        b.iter(|| cfg.generate(&inputs).unwrap());
    });
}

criterion_group!(benches, bench_random_split, bench_balanced_split, bench_matched_split);
criterion_main!(benches);
