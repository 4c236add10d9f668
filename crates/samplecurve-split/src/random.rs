//! Random (optionally stratified) train/val/test splitting over a masked population.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::classes::group_by_class;
use crate::error::SplitError;
use crate::mask::ValidityMask;
use crate::record::SplitRecord;

/// Random train/val/test splitter.
///
/// Construct via [`RandomSplitter::new`], then chain `with_*` methods.
/// Defaults: `stratify = false`, `seed = 0`.
#[derive(Debug, Clone)]
pub struct RandomSplitter {
    n_train: usize,
    n_val: usize,
    n_test: usize,
    stratify: bool,
    seed: u64,
}

impl RandomSplitter {
    /// Create a splitter producing sets of exactly the given sizes.
    #[must_use]
    pub fn new(n_train: usize, n_val: usize, n_test: usize) -> Self {
        Self {
            n_train,
            n_val,
            n_test,
            stratify: false,
            seed: 0,
        }
    }

    /// Preserve class proportions of the labels in every partition.
    #[must_use]
    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Total number of rows the three sets consume.
    #[must_use]
    pub fn requested(&self) -> usize {
        self.n_train + self.n_val + self.n_test
    }

    /// Split the rows selected by `mask` (all rows when `None`).
    ///
    /// The test set is drawn first from the whole masked population, then
    /// train and validation sets are drawn from what remains. Sets are
    /// returned in sampling order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::ShapeMismatch`] | `mask` length differs from `labels` |
    /// | [`SplitError::InsufficientSamples`] | masked population smaller than the requested total |
    /// | [`SplitError::InsufficientClassCount`] | stratified and a class cannot reach every non-empty set |
    pub fn split(
        &self,
        labels: &[f64],
        mask: Option<&ValidityMask>,
    ) -> Result<SplitRecord, SplitError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.split_with_rng(labels, mask, &mut rng)
    }

    #[instrument(skip_all, fields(n_train = self.n_train, n_val = self.n_val, n_test = self.n_test, stratify = self.stratify))]
    pub(crate) fn split_with_rng(
        &self,
        labels: &[f64],
        mask: Option<&ValidityMask>,
        rng: &mut ChaCha8Rng,
    ) -> Result<SplitRecord, SplitError> {
        // Original-space rows of the working population.
        let population: Vec<usize> = match mask {
            None => (0..labels.len()).collect(),
            Some(mask) => {
                mask.check_len("labels", labels.len())?;
                mask.indices()
            }
        };

        let requested = self.requested();
        if population.len() < requested {
            return Err(SplitError::InsufficientSamples {
                requested,
                available: population.len(),
            });
        }

        // All sampling happens in mask-local coordinates.
        let local_labels: Vec<f64> = population.iter().map(|&i| labels[i]).collect();
        let local: Vec<usize> = (0..population.len()).collect();

        if self.stratify {
            self.check_class_sizes(&local_labels, &local)?;
        }

        let (test, rest) = draw(&local_labels, local, self.n_test, self.stratify, rng);
        let (train, rest) = draw(&local_labels, rest, self.n_train, self.stratify, rng);
        let (val, _) = draw(&local_labels, rest, self.n_val, self.stratify, rng);

        let to_original =
            |set: Vec<usize>| -> Vec<usize> { set.into_iter().map(|i| population[i]).collect() };
        debug!(
            population = population.len(),
            train = train.len(),
            val = val.len(),
            test = test.len(),
            "random split drawn"
        );

        Ok(SplitRecord::new(
            to_original(train),
            to_original(val),
            to_original(test),
            self.seed,
            self.stratify,
        ))
    }

    fn check_class_sizes(&self, labels: &[f64], local: &[usize]) -> Result<(), SplitError> {
        let required = [self.n_train, self.n_val, self.n_test]
            .iter()
            .filter(|&&n| n > 0)
            .count();
        for group in group_by_class(labels, local) {
            if group.members.len() < required {
                return Err(SplitError::InsufficientClassCount {
                    class: group.label,
                    count: group.members.len(),
                    required,
                });
            }
        }
        Ok(())
    }
}

/// Draw `size` items from `pool`, returning `(drawn, remaining)`.
///
/// Stratified draws take a per-class quota from each shuffled class; the
/// drawn items are shuffled again so they are not blocked by class.
fn draw(
    labels: &[f64],
    mut pool: Vec<usize>,
    size: usize,
    stratify: bool,
    rng: &mut ChaCha8Rng,
) -> (Vec<usize>, Vec<usize>) {
    debug_assert!(size <= pool.len(), "draw size exceeds pool");
    if size == 0 {
        return (Vec::new(), pool);
    }

    if !stratify {
        pool.shuffle(rng);
        let rest = pool.split_off(size);
        return (pool, rest);
    }

    let mut groups = group_by_class(labels, &pool);
    for group in &mut groups {
        group.members.shuffle(rng);
    }
    let counts: Vec<usize> = groups.iter().map(|g| g.members.len()).collect();
    let quotas = approximate_mode(&counts, size);

    let mut drawn = Vec::with_capacity(size);
    let mut rest = Vec::with_capacity(pool.len() - size);
    for (mut group, quota) in groups.into_iter().zip(quotas) {
        rest.extend(group.members.split_off(quota));
        drawn.extend(group.members);
    }
    drawn.shuffle(rng);
    (drawn, rest)
}

/// Integer per-class quotas summing to `n`, proportional to `counts`.
///
/// Each class gets `floor(n * c / total)`; the shortfall goes to the
/// classes with the largest remainders (then larger classes, then earlier
/// classes).
fn approximate_mode(counts: &[usize], n: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let mut quotas: Vec<usize> = counts.iter().map(|&c| n * c / total).collect();
    let short = n - quotas.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = n * counts[a] % total;
        let rb = n * counts[b] % total;
        rb.cmp(&ra)
            .then(counts[b].cmp(&counts[a]))
            .then(a.cmp(&b))
    });
    for &k in order.iter().take(short) {
        quotas[k] += 1;
    }
    quotas
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn assert_disjoint(record: &SplitRecord) {
        let train: HashSet<_> = record.idx_train().iter().collect();
        let val: HashSet<_> = record.idx_val().iter().collect();
        let test: HashSet<_> = record.idx_test().iter().collect();
        assert!(train.is_disjoint(&val));
        assert!(train.is_disjoint(&test));
        assert!(val.is_disjoint(&test));
        assert_eq!(train.len(), record.idx_train().len(), "duplicate in train");
    }

    #[test]
    fn unstratified_sizes_and_range() {
        let labels: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let record = RandomSplitter::new(700, 150, 150).split(&labels, None).unwrap();

        assert_eq!(record.idx_train().len(), 700);
        assert_eq!(record.idx_val().len(), 150);
        assert_eq!(record.idx_test().len(), 150);
        assert_eq!(record.samplesize(), 700);
        assert_eq!(record.seed(), 0);
        assert!(!record.stratify());
        for (_, set) in record.sets() {
            assert!(set.iter().all(|&i| i < 1000));
        }
        assert_disjoint(&record);
    }

    #[test]
    fn same_seed_same_split() {
        let labels: Vec<f64> = (0..200).map(|i| (i % 3) as f64).collect();
        let splitter = RandomSplitter::new(50, 20, 20).with_stratify(true).with_seed(9);
        assert_eq!(
            splitter.split(&labels, None).unwrap(),
            splitter.split(&labels, None).unwrap()
        );
    }

    #[test]
    fn different_seeds_differ() {
        let labels = vec![0.0; 100];
        let a = RandomSplitter::new(10, 5, 5).with_seed(1).split(&labels, None).unwrap();
        let b = RandomSplitter::new(10, 5, 5).with_seed(2).split(&labels, None).unwrap();
        assert_ne!(a.idx_train(), b.idx_train());
    }

    #[test]
    fn mask_restricts_population() {
        let labels = vec![0.0; 20];
        let mask = ValidityMask::from_bools((0..20).map(|i| i % 2 == 0).collect());
        let record = RandomSplitter::new(6, 2, 2).split(&labels, Some(&mask)).unwrap();
        for (_, set) in record.sets() {
            assert!(set.iter().all(|&i| i % 2 == 0));
        }
        assert_disjoint(&record);
    }

    #[test]
    fn exact_fit_uses_whole_population() {
        let labels = vec![0.0; 10];
        let record = RandomSplitter::new(6, 2, 2).split(&labels, None).unwrap();
        let mut all: Vec<usize> = record.sets().iter().flat_map(|(_, s)| s.to_vec()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn too_small_population_fails() {
        let labels = vec![0.0; 10];
        let err = RandomSplitter::new(7, 2, 2).split(&labels, None).unwrap_err();
        assert!(matches!(
            err,
            SplitError::InsufficientSamples {
                requested: 11,
                available: 10
            }
        ));
    }

    #[test]
    fn stratified_preserves_proportions() {
        // 75% class 0, 25% class 1
        let labels: Vec<f64> = (0..400).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect();
        let record = RandomSplitter::new(200, 40, 80)
            .with_stratify(true)
            .with_seed(3)
            .split(&labels, None)
            .unwrap();
        let positives = |set: &[usize]| set.iter().filter(|&&i| labels[i] == 1.0).count();
        assert_eq!(positives(record.idx_test()), 20);
        assert_eq!(positives(record.idx_train()), 50);
        assert_eq!(positives(record.idx_val()), 10);
        assert!(record.stratify());
        assert_disjoint(&record);
    }

    #[test]
    fn stratified_rejects_singleton_class() {
        let mut labels = vec![0.0; 30];
        labels[4] = 1.0;
        let err = RandomSplitter::new(10, 5, 5)
            .with_stratify(true)
            .split(&labels, None)
            .unwrap_err();
        assert!(matches!(
            err,
            SplitError::InsufficientClassCount {
                count: 1,
                required: 3,
                ..
            }
        ));
    }

    #[test]
    fn zero_sized_sets_are_empty() {
        let labels = vec![1.0; 5];
        let record = RandomSplitter::new(1, 0, 0)
            .with_stratify(true)
            .split(&labels, None)
            .unwrap();
        assert_eq!(record.idx_train().len(), 1);
        assert!(record.idx_val().is_empty());
        assert!(record.idx_test().is_empty());
    }

    #[test]
    fn mask_length_mismatch() {
        let err = RandomSplitter::new(1, 0, 0)
            .split(&[0.0, 1.0], Some(&ValidityMask::full(3)))
            .unwrap_err();
        assert!(matches!(err, SplitError::ShapeMismatch { .. }));
    }

    #[test]
    fn approximate_mode_sums_to_n() {
        assert_eq!(approximate_mode(&[3, 3, 4], 5), vec![2, 1, 2]);
        assert_eq!(approximate_mode(&[90, 10], 20), vec![18, 2]);
        assert_eq!(approximate_mode(&[1, 1], 1), vec![1, 0]);
        assert_eq!(approximate_mode(&[5], 0), vec![0]);
        for n in 0..=17 {
            let q = approximate_mode(&[7, 6, 4], n);
            assert_eq!(q.iter().sum::<usize>(), n);
            assert!(q.iter().zip([7, 6, 4]).all(|(&q, c)| q <= c));
        }
    }
}
