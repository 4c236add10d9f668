//! Class-balancing by random undersampling.

use rand::SeedableRng;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::classes::group_by_class;
use crate::error::SplitError;
use crate::mask::ValidityMask;

/// Undersamples every class down to the minority class count.
#[derive(Debug, Clone)]
pub struct BalancedResampler {
    seed: u64,
}

impl BalancedResampler {
    /// Create a resampler drawing with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Clear rows from `mask` until every class has the minority class count.
    ///
    /// Rows kept within each class are drawn uniformly without replacement.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SplitError::ShapeMismatch`] | `mask` length differs from `labels` |
    /// | [`SplitError::DegenerateClasses`] | fewer than 2 classes among masked rows |
    pub fn resample(&self, labels: &[f64], mask: &ValidityMask) -> Result<ValidityMask, SplitError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.resample_with_rng(labels, mask, &mut rng)
    }

    #[instrument(skip_all, fields(n_masked = mask.count()))]
    pub(crate) fn resample_with_rng(
        &self,
        labels: &[f64],
        mask: &ValidityMask,
        rng: &mut ChaCha8Rng,
    ) -> Result<ValidityMask, SplitError> {
        mask.check_len("labels", labels.len())?;
        let groups = group_by_class(labels, &mask.indices());
        if groups.len() < 2 {
            return Err(SplitError::DegenerateClasses {
                n_classes: groups.len(),
            });
        }

        let minority = groups
            .iter()
            .map(|g| g.members.len())
            .min()
            .unwrap_or(0);

        let mut dropped = Vec::new();
        for group in &groups {
            let mut keep = vec![false; group.members.len()];
            for pos in sample(rng, group.members.len(), minority) {
                keep[pos] = true;
            }
            dropped.extend(
                group
                    .members
                    .iter()
                    .zip(&keep)
                    .filter_map(|(&row, &kept)| (!kept).then_some(row)),
            );
        }

        debug!(
            n_classes = groups.len(),
            minority,
            n_dropped = dropped.len(),
            "undersampled to minority class"
        );
        Ok(mask.clone().without(dropped))
    }
}
