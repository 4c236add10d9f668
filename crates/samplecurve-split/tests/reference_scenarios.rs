//! Reference scenarios for the three sampling policies.
//!
//! Each test drives [`SplitConfig::generate`] end to end on a small,
//! fully specified dataset and checks sizes, containment and
//! reproducibility of the produced record.

use std::collections::HashSet;

use samplecurve_split::{
    RandomSplitter, SamplingPolicy, SplitConfig, SplitInputs, SplitOutcome, StandardizedMatching,
    ValidityMask, combined_validity,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn all_indices(outcome: &SplitOutcome) -> Vec<usize> {
    let record = outcome.record().expect("expected a split");
    record
        .sets()
        .iter()
        .flat_map(|(_, s)| s.iter().copied())
        .collect()
}

fn assert_disjoint(outcome: &SplitOutcome) {
    let indices = all_indices(outcome);
    let unique: HashSet<usize> = indices.iter().copied().collect();
    assert_eq!(unique.len(), indices.len(), "index sets overlap");
}

// ---------------------------------------------------------------------------
// a) one matched pair from ten rows
// ---------------------------------------------------------------------------

#[test]
fn matched_single_pair() {
    let y = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
    let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 * 0.1]).collect();
    let matching: Vec<Vec<f64>> = vec![
        vec![0.3],
        vec![1.2],
        vec![0.7],
        vec![2.0],
        vec![0.1],
        vec![1.9],
        vec![0.8],
        vec![1.5],
        vec![0.4],
        vec![1.1],
    ];
    let inputs = SplitInputs::new(&x, &y).unwrap().with_matching(&matching);
    let config = SplitConfig::new(2, 0, 0)
        .unwrap()
        .with_policy(SamplingPolicy::Matched)
        .with_seed(0);

    let outcome = config.generate(&inputs).unwrap();
    let record = outcome.record().unwrap();

    assert_eq!(record.samplesize(), 2);
    assert!(record.idx_val().is_empty());
    assert!(record.idx_test().is_empty());

    let train = record.idx_train();
    assert_eq!(train.len(), 2);
    let cases: Vec<usize> = train.iter().copied().filter(|&i| y[i] == 1.0).collect();
    let controls: Vec<usize> = train.iter().copied().filter(|&i| y[i] == 0.0).collect();
    assert_eq!(cases.len(), 1);
    assert_eq!(controls.len(), 1);
    assert!(cases[0] == 6 || cases[0] == 7);

    let standardized = StandardizedMatching::fit(&matching, &ValidityMask::full(10)).unwrap();
    let expected = standardized.distance(cases[0], controls[0]);
    let score = record.average_matching_score().unwrap();
    assert!((score - expected).abs() < 1e-12, "score {score} != {expected}");

    // the chosen control is a nearest neighbour of the case
    let best = (0..10)
        .filter(|&i| y[i] == 0.0)
        .map(|i| standardized.distance(cases[0], i))
        .fold(f64::INFINITY, f64::min);
    assert!((score - best).abs() < 1e-12);

    // reproducible
    let again = config.generate(&inputs).unwrap();
    assert_eq!(outcome, again);
}

// ---------------------------------------------------------------------------
// b) unstratified random split of 1000 rows
// ---------------------------------------------------------------------------

#[test]
fn random_split_of_thousand_rows() {
    let y: Vec<f64> = (0..1000).map(|i| i as f64).collect();
    let record = RandomSplitter::new(700, 150, 150)
        .with_seed(0)
        .split(&y, None)
        .unwrap();

    assert_eq!(record.idx_train().len(), 700);
    assert_eq!(record.idx_val().len(), 150);
    assert_eq!(record.idx_test().len(), 150);
    assert_eq!(record.samplesize(), 700);
    assert!(!record.stratify());

    let mut all: Vec<usize> = record
        .sets()
        .iter()
        .flat_map(|(_, s)| s.iter().copied())
        .collect();
    assert!(all.iter().all(|&i| i < 1000));
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 1000);
}

// ---------------------------------------------------------------------------
// c) balanced policy consumes exactly the balanced population
// ---------------------------------------------------------------------------

#[test]
fn balanced_exact_fit() {
    let y: Vec<f64> = (0..100).map(|i| if i < 10 { 1.0 } else { 0.0 }).collect();
    let x: Vec<Vec<f64>> = (0..100).map(|i| vec![(i as f64).sin()]).collect();
    let inputs = SplitInputs::new(&x, &y).unwrap();

    let outcome = SplitConfig::new(16, 2, 2)
        .unwrap()
        .with_policy(SamplingPolicy::Balanced)
        .generate(&inputs)
        .unwrap();
    assert_disjoint(&outcome);
    let indices = all_indices(&outcome);
    assert_eq!(indices.len(), 20);
    assert_eq!(indices.iter().filter(|&&i| y[i] == 1.0).count(), 10);
    assert_eq!(indices.iter().filter(|&&i| y[i] == 0.0).count(), 10);

    let record = outcome.record().unwrap();
    assert_eq!(record.idx_train().len(), 16);
    assert_eq!(record.idx_val().len(), 2);
    assert_eq!(record.idx_test().len(), 2);
    assert!(record.stratify());
}

// ---------------------------------------------------------------------------
// d) insufficiency boundary
// ---------------------------------------------------------------------------

#[test]
fn one_more_than_available_is_insufficient() {
    let mut x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
    // five unusable rows leave 35
    for row in x.iter_mut().take(5) {
        row[0] = f64::NAN;
    }
    let y: Vec<f64> = (0..40).map(|i| (i % 2) as f64).collect();
    let inputs = SplitInputs::new(&x, &y).unwrap();

    let exact = SplitConfig::new(25, 5, 5).unwrap().generate(&inputs).unwrap();
    assert!(exact.record().is_some());
    assert_disjoint(&exact);

    let over = SplitConfig::new(26, 5, 5).unwrap().generate(&inputs).unwrap();
    assert!(matches!(over, SplitOutcome::Insufficient { .. }));
}

// ---------------------------------------------------------------------------
// e) availability masks from earlier stages are honoured
// ---------------------------------------------------------------------------

#[test]
fn upstream_availability_is_intersected() {
    let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
    let y: Vec<f64> = (0..30).map(|i| (i % 2) as f64).collect();
    let rejected: HashSet<usize> = [1, 4, 9, 16, 25].into_iter().collect();
    let availability = ValidityMask::from_bools((0..30).map(|i| !rejected.contains(&i)).collect());
    let inputs = SplitInputs::new(&x, &y)
        .unwrap()
        .with_feature_availability(availability)
        .unwrap();

    let outcome = SplitConfig::new(15, 5, 5).unwrap().generate(&inputs).unwrap();
    let indices = all_indices(&outcome);
    assert_eq!(indices.len(), 25);
    assert!(indices.iter().all(|i| !rejected.contains(i)));
}

// ---------------------------------------------------------------------------
// f) combined validity over all sources
// ---------------------------------------------------------------------------

#[test]
fn combined_validity_masks_every_source() {
    let x = vec![vec![0.0, 1.0], vec![0.0, f64::NAN], vec![0.0, 1.0], vec![0.0, 1.0]];
    let y = vec![0.0, 1.0, f64::NEG_INFINITY, 1.0];
    let m = vec![vec![0.0], vec![0.0], vec![0.0], vec![f64::NAN]];
    let mask = combined_validity(&x, &y, Some(m.as_slice())).unwrap();
    assert_eq!(mask.indices(), vec![0]);
}
