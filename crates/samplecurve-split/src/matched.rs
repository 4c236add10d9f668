//! Case/control matching: random case split plus greedy nearest-control assignment.
//!
//! Cases (`label == 1`) are split at half the requested sizes. Each case, in
//! the order the case split returned it, is then paired with the closest
//! still-unassigned control (`label == 0`) in standardized matching space.
//! Controls are assigned without replacement across all three sets.

use std::collections::{BTreeSet, HashSet};

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::error::SplitError;
use crate::mask::ValidityMask;
use crate::random::RandomSplitter;
use crate::record::SplitRecord;

/// Matching variables z-scored per column.
///
/// Statistics come from the rows of the mask passed at construction and are
/// never recomputed, so every score lives in one fixed space. Uses the
/// population standard deviation; a constant column keeps scale 1.
#[derive(Debug, Clone)]
pub struct StandardizedMatching {
    rows: Vec<Vec<f64>>,
}

impl StandardizedMatching {
    /// Standardize `matching` with statistics from the rows set in `mask`.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::ShapeMismatch`] if `matching` and `mask` differ in length.
    pub fn fit(matching: &[Vec<f64>], mask: &ValidityMask) -> Result<Self, SplitError> {
        mask.check_len("matching source", matching.len())?;
        let used = mask.indices();
        let n_cols = used.first().map_or(0, |&i| matching[i].len());
        let n = used.len() as f64;

        let mut mean = vec![0.0; n_cols];
        for &i in &used {
            for (m, &v) in mean.iter_mut().zip(&matching[i]) {
                *m += v / n;
            }
        }
        let mut scale = vec![0.0; n_cols];
        for &i in &used {
            for ((s, &m), &v) in scale.iter_mut().zip(&mean).zip(&matching[i]) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in &mut scale {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }

        let rows = matching
            .iter()
            .map(|row| {
                row.iter()
                    .zip(mean.iter().zip(&scale))
                    .map(|(&v, (&m, &s))| (v - m) / s)
                    .collect()
            })
            .collect();
        Ok(Self { rows })
    }

    /// Squared Euclidean distance between two rows.
    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        self.rows[a]
            .iter()
            .zip(&self.rows[b])
            .map(|(x, y)| (x - y).powi(2))
            .sum()
    }

    /// Borrow a standardized row.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }
}

/// A control assigned to a case.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Assignment {
    control: usize,
    score: f64,
}

/// Controls still available for assignment, in ascending row order.
#[derive(Debug, Clone)]
struct ControlPool {
    rows: BTreeSet<usize>,
}

impl ControlPool {
    fn new(controls: &ValidityMask) -> Self {
        Self {
            rows: controls.indices().into_iter().collect(),
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    /// Pick the closest control to `case` and return the pool without it.
    ///
    /// Candidates are permuted with `rng` before the first minimum is taken,
    /// so exact ties do not always favor the lowest row index.
    fn assign(
        mut self,
        case: usize,
        matching: &StandardizedMatching,
        rng: &mut ChaCha8Rng,
    ) -> Option<(Self, Assignment)> {
        let mut candidates: Vec<(f64, usize)> = self
            .rows
            .iter()
            .map(|&row| (matching.distance(case, row), row))
            .collect();
        candidates.shuffle(rng);

        let (score, control) = candidates
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))?;
        self.rows.remove(&control);
        Some((self, Assignment { control, score }))
    }
}

/// Confound-matched train/val/test splitter for binary labels.
///
/// Construct via [`MatchedSplitter::new`], then chain `with_*` methods.
/// `n_train`, `n_val` and `n_test` are totals; each set gets half its size
/// in cases and the same number of matched controls.
#[derive(Debug, Clone)]
pub struct MatchedSplitter {
    n_train: usize,
    n_val: usize,
    n_test: usize,
    stratify: bool,
    seed: u64,
}

impl MatchedSplitter {
    /// Create a splitter for the given total set sizes.
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

    /// Stratify the case split (cases form a single class).
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

    /// Number of cases the split draws (`n_train/2 + n_val/2 + n_test/2`).
    #[must_use]
    pub fn cases_required(&self) -> usize {
        self.n_train / 2 + self.n_val / 2 + self.n_test / 2
    }

    /// Build matched sets from the rows selected by `mask`.
    ///
    /// Each set lists its cases first, then their matched controls in case
    /// order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::InvalidSampleSize`] | `n_train / 2` is zero |
    /// | [`SplitError::ShapeMismatch`] | `labels`, `matching` and `mask` differ in length |
    /// | [`SplitError::InsufficientSamples`] | too few cases or controls under `mask` |
    /// | [`SplitError::MatchingInvariantViolated`] | an assigned control breaks a matching contract |
    #[instrument(skip_all, fields(n_train = self.n_train, n_val = self.n_val, n_test = self.n_test, seed = self.seed))]
    pub fn split(
        &self,
        labels: &[f64],
        matching: &[Vec<f64>],
        mask: &ValidityMask,
    ) -> Result<SplitRecord, SplitError> {
        if self.n_train / 2 == 0 {
            return Err(SplitError::InvalidSampleSize {
                n_train: self.n_train,
            });
        }
        mask.check_len("labels", labels.len())?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let case_mask = mask.where_label(labels, 1.0)?;
        let case_split = RandomSplitter::new(self.n_train / 2, self.n_val / 2, self.n_test / 2)
            .with_stratify(self.stratify)
            .with_seed(self.seed)
            .split_with_rng(labels, Some(&case_mask), &mut rng)?;

        let standardized = StandardizedMatching::fit(matching, mask)?;
        let mut pool = ControlPool::new(&mask.where_label(labels, 0.0)?);
        let n_controls = pool.len();
        debug!(n_cases = case_mask.count(), n_controls, "matching pools ready");

        let cases: HashSet<usize> = case_split
            .sets()
            .iter()
            .flat_map(|(_, set)| set.iter().copied())
            .collect();
        let mut assigned: HashSet<usize> = HashSet::with_capacity(cases.len());
        let mut scores = Vec::with_capacity(cases.len());
        let mut matched_sets: Vec<Vec<usize>> = Vec::with_capacity(3);

        for (_, case_set) in case_split.sets() {
            let mut controls = Vec::with_capacity(case_set.len());
            for &case in case_set {
                let (next, assignment) = pool
                    .assign(case, &standardized, &mut rng)
                    .ok_or_else(|| SplitError::InsufficientSamples {
                        requested: cases.len(),
                        available: n_controls,
                    })?;
                pool = next;
                check_assignment(case, assignment.control, labels, mask, &cases, &mut assigned)?;
                controls.push(assignment.control);
                scores.push(assignment.score);
            }
            let mut set = case_set.to_vec();
            set.extend(controls);
            matched_sets.push(set);
        }

        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        info!(
            n_pairs = scores.len(),
            average_matching_score = average,
            "controls matched"
        );

        let mut sets = matched_sets.into_iter();
        let (train, val, test) = (
            sets.next().unwrap_or_default(),
            sets.next().unwrap_or_default(),
            sets.next().unwrap_or_default(),
        );
        Ok(case_split.with_matched_controls(train, val, test, average))
    }
}

/// Contract checks on a freshly assigned control.
fn check_assignment(
    case: usize,
    control: usize,
    labels: &[f64],
    mask: &ValidityMask,
    cases: &HashSet<usize>,
    assigned: &mut HashSet<usize>,
) -> Result<(), SplitError> {
    let violation = |reason| SplitError::MatchingInvariantViolated {
        case,
        control,
        reason,
    };
    if !mask.get(control) {
        return Err(violation("control is outside the validity mask"));
    }
    if cases.contains(&control) || labels[control] != 0.0 {
        return Err(violation("control is a case"));
    }
    if !assigned.insert(control) {
        return Err(violation("control was already assigned"));
    }
    Ok(())
}
