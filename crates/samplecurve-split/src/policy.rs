//! Sampling policy selection, sufficiency checks and split post-conditions.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, warn};

use crate::balance::BalancedResampler;
use crate::classes::{ClassCount, class_counts};
use crate::error::SplitError;
use crate::inputs::SplitInputs;
use crate::mask::ValidityMask;
use crate::matched::MatchedSplitter;
use crate::random::RandomSplitter;
use crate::record::{SplitOutcome, SplitRecord};

/// Above this many classes the target is treated as continuous and never stratified.
pub const MAX_STRATIFY_CLASSES: usize = 10;

/// How rows are chosen before splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPolicy {
    /// Plain random sampling from all usable rows.
    None,
    /// Undersample every class to the minority count first.
    Balanced,
    /// Pair each case with its nearest control on the matching source.
    Matched,
}

impl SamplingPolicy {
    /// The lowercase name used on the command line and in file names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingPolicy::None => "none",
            SamplingPolicy::Balanced => "balanced",
            SamplingPolicy::Matched => "matched",
        }
    }
}

impl fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplingPolicy {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SamplingPolicy::None),
            "balanced" => Ok(SamplingPolicy::Balanced),
            "matched" => Ok(SamplingPolicy::Matched),
            other => Err(SplitError::UnknownPolicy {
                name: other.to_string(),
            }),
        }
    }
}

/// Configuration for one split: sizes, seed, stratification and policy.
///
/// Construct via [`SplitConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter  | Default |
/// |------------|---------|
/// | `seed`     | 0       |
/// | `stratify` | `false` |
/// | `policy`   | `None`  |
#[derive(Debug, Clone)]
pub struct SplitConfig {
    n_train: usize,
    n_val: usize,
    n_test: usize,
    seed: u64,
    stratify: bool,
    policy: SamplingPolicy,
}

impl SplitConfig {
    /// Create a config for the given set sizes.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidSampleSize`] if `n_train` is zero.
    pub fn new(n_train: usize, n_val: usize, n_test: usize) -> Result<Self, SplitError> {
        if n_train == 0 {
            return Err(SplitError::InvalidSampleSize { n_train });
        }
        Ok(Self {
            n_train,
            n_val,
            n_test,
            seed: 0,
            stratify: false,
            policy: SamplingPolicy::None,
        })
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Request class-stratified sampling (ignored for more than
    /// [`MAX_STRATIFY_CLASSES`] classes).
    #[must_use]
    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    /// Set the sampling policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Return the requested training-set size.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.n_train
    }

    /// Return the requested validation-set size.
    #[must_use]
    pub fn n_val(&self) -> usize {
        self.n_val
    }

    /// Return the requested test-set size.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.n_test
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return whether stratification was requested.
    #[must_use]
    pub fn stratify(&self) -> bool {
        self.stratify
    }

    /// Return the sampling policy.
    #[must_use]
    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    fn requested(&self) -> usize {
        self.n_train + self.n_val + self.n_test
    }

    /// Generate the split for `inputs`.
    ///
    /// Lack of data is not an error: it yields [`SplitOutcome::Insufficient`]
    /// so that a sweep over many configurations can carry on. Every emitted
    /// index set is sorted ascending and has been checked against the data.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::ShapeMismatch`] | inputs disagree in row count |
    /// | [`SplitError::InvalidMatchingSource`] | matched policy without a matching source of one row per sample |
    /// | [`SplitError::ImbalancedData`] | class structure unusable by the policy |
    /// | [`SplitError::InvalidSampleSize`] | matched policy with `n_train < 2` |
    /// | [`SplitError::MatchingInvariantViolated`] | a matched control broke a contract |
    /// | [`SplitError::PostconditionViolated`] | an emitted row is not fully usable |
    #[instrument(skip_all, fields(policy = %self.policy, n_train = self.n_train, seed = self.seed))]
    pub fn generate(&self, inputs: &SplitInputs<'_>) -> Result<SplitOutcome, SplitError> {
        let targets = inputs.targets();
        let mut mask = inputs.base_mask()?;
        let counts = class_counts(targets, &mask);
        info!(
            n_samples = inputs.n_samples(),
            n_usable = mask.count(),
            n_classes = counts.len(),
            "base mask computed"
        );

        if counts.len() <= 1 {
            return Ok(insufficient(format!(
                "{} distinct class(es) among {} usable rows",
                counts.len(),
                mask.count()
            )));
        }

        let stratify = self.stratify && counts.len() <= MAX_STRATIFY_CLASSES;
        if self.stratify && !stratify {
            debug!(n_classes = counts.len(), "too many classes, stratification disabled");
        }

        let requested = self.requested();
        let result = match self.policy {
            SamplingPolicy::None => {
                if mask.count() < requested {
                    return Ok(too_few(requested, mask.count()));
                }
                RandomSplitter::new(self.n_train, self.n_val, self.n_test)
                    .with_stratify(stratify)
                    .with_seed(self.seed)
                    .split(targets, Some(&mask))
            }
            SamplingPolicy::Balanced => {
                if inputs.matching().is_some() {
                    debug!("matching source ignored under balanced sampling");
                }
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                mask = BalancedResampler::new(self.seed)
                    .resample_with_rng(targets, &mask, &mut rng)
                    .map_err(|e| match e {
                        SplitError::DegenerateClasses { .. } => SplitError::ImbalancedData {
                            policy: self.policy,
                            class_counts: counts.clone(),
                            reason: "undersampling needs at least two classes",
                        },
                        other => other,
                    })?;
                if mask.count() < requested {
                    return Ok(too_few(requested, mask.count()));
                }
                RandomSplitter::new(self.n_train, self.n_val, self.n_test)
                    .with_stratify(true)
                    .with_seed(self.seed)
                    .split_with_rng(targets, Some(&mask), &mut rng)
            }
            SamplingPolicy::Matched => {
                let matching = inputs.matching().ok_or_else(|| SplitError::InvalidMatchingSource {
                    reason: "matched sampling needs a matching source".to_string(),
                    n_samples: inputs.n_samples(),
                })?;
                if matching.len() != inputs.n_samples() {
                    return Err(SplitError::InvalidMatchingSource {
                        reason: format!("matching source has {} rows", matching.len()),
                        n_samples: inputs.n_samples(),
                    });
                }
                mask = mask.and(&inputs.matching_mask(matching)?)?;
                match self.matched_sufficiency(targets, &mask)? {
                    Some(reason) => return Ok(insufficient(reason)),
                    None => MatchedSplitter::new(self.n_train, self.n_val, self.n_test)
                        .with_stratify(true)
                        .with_seed(self.seed)
                        .split(targets, matching, &mask),
                }
            }
        };

        let record = match result {
            Ok(record) => record,
            Err(
                e @ (SplitError::InsufficientSamples { .. }
                | SplitError::InsufficientClassCount { .. }),
            ) => return Ok(insufficient(e.to_string())),
            Err(e) => return Err(e),
        };

        check_postconditions(&record, inputs, &mask)?;
        let record = record.sorted();
        info!(
            train = record.idx_train().len(),
            val = record.idx_val().len(),
            test = record.idx_test().len(),
            samplesize = record.samplesize(),
            "split generated"
        );
        Ok(SplitOutcome::Split(record))
    }

    /// Class and size checks for matched sampling; `Some(reason)` when data runs short.
    fn matched_sufficiency(
        &self,
        targets: &[f64],
        mask: &ValidityMask,
    ) -> Result<Option<String>, SplitError> {
        let counts = class_counts(targets, mask);
        if counts.len() <= 1 {
            return Ok(Some(format!(
                "{} distinct class(es) after matching-source masking",
                counts.len()
            )));
        }
        let unsupported = |reason| SplitError::ImbalancedData {
            policy: SamplingPolicy::Matched,
            class_counts: counts.clone(),
            reason,
        };
        let [controls, cases]: [ClassCount; 2] = counts
            .clone()
            .try_into()
            .map_err(|_| unsupported("matching needs exactly two classes"))?;
        if controls.label != 0.0 || cases.label != 1.0 {
            return Err(unsupported("matching needs labels 0 (control) and 1 (case)"));
        }

        let splitter = MatchedSplitter::new(self.n_train, self.n_val, self.n_test);
        if self.n_train / 2 == 0 {
            return Err(SplitError::InvalidSampleSize {
                n_train: self.n_train,
            });
        }
        let needed = splitter.cases_required();
        if cases.count < needed {
            return Ok(Some(format!("need {needed} cases, have {}", cases.count)));
        }
        if controls.count < needed {
            return Ok(Some(format!("need {needed} controls, have {}", controls.count)));
        }
        Ok(None)
    }
}

fn insufficient(reason: String) -> SplitOutcome {
    warn!(%reason, "insufficient samples, configuration skipped");
    SplitOutcome::Insufficient { reason }
}

fn too_few(requested: usize, available: usize) -> SplitOutcome {
    insufficient(format!("requested {requested} samples, {available} available"))
}

/// Every emitted row must be in `mask` and have finite features and target.
fn check_postconditions(
    record: &SplitRecord,
    inputs: &SplitInputs<'_>,
    mask: &ValidityMask,
) -> Result<(), SplitError> {
    for (set, indices) in record.sets() {
        if let Some(&index) = indices.iter().find(|&&i| !mask.get(i)) {
            return Err(SplitError::PostconditionViolated {
                set,
                index,
                reason: "is outside the validity mask",
            });
        }
    }
    record.verify_rows(inputs.features(), inputs.targets())
}
