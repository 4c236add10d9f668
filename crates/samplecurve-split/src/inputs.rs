//! Borrowed input arrays for split generation.

use crate::error::SplitError;
use crate::mask::{ValidityMask, combined_validity};

/// Feature, target and optional matching arrays for one dataset, plus the
/// availability masks handed down by earlier pipeline stages.
///
/// The matching source is not shape-checked here; that happens once the
/// sampling policy is known.
#[derive(Debug, Clone)]
pub struct SplitInputs<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    matching: Option<&'a [Vec<f64>]>,
    feature_availability: Option<ValidityMask>,
    target_availability: Option<ValidityMask>,
    matching_availability: Option<ValidityMask>,
}

impl<'a> SplitInputs<'a> {
    /// Pair a row-major feature matrix with its target vector.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::ShapeMismatch`] if the row counts differ.
    pub fn new(features: &'a [Vec<f64>], targets: &'a [f64]) -> Result<Self, SplitError> {
        if targets.len() != features.len() {
            return Err(SplitError::ShapeMismatch {
                what: "targets",
                expected: features.len(),
                got: targets.len(),
            });
        }
        Ok(Self {
            features,
            targets,
            matching: None,
            feature_availability: None,
            target_availability: None,
            matching_availability: None,
        })
    }

    /// Attach a matching (confound) source, one row per sample.
    #[must_use]
    pub fn with_matching(mut self, matching: &'a [Vec<f64>]) -> Self {
        self.matching = Some(matching);
        self
    }

    /// Rows of the feature source marked usable upstream.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::ShapeMismatch`] if the mask length differs from the row count.
    pub fn with_feature_availability(mut self, mask: ValidityMask) -> Result<Self, SplitError> {
        self.check_availability("feature availability", &mask)?;
        self.feature_availability = Some(mask);
        Ok(self)
    }

    /// Rows of the target source marked usable upstream.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::ShapeMismatch`] if the mask length differs from the row count.
    pub fn with_target_availability(mut self, mask: ValidityMask) -> Result<Self, SplitError> {
        self.check_availability("target availability", &mask)?;
        self.target_availability = Some(mask);
        Ok(self)
    }

    /// Rows of the matching source marked usable upstream.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::ShapeMismatch`] if the mask length differs from the row count.
    pub fn with_matching_availability(mut self, mask: ValidityMask) -> Result<Self, SplitError> {
        self.check_availability("matching availability", &mask)?;
        self.matching_availability = Some(mask);
        Ok(self)
    }

    /// Number of rows in the population.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.targets.len()
    }

    /// The feature matrix.
    #[must_use]
    pub fn features(&self) -> &'a [Vec<f64>] {
        self.features
    }

    /// The target vector.
    #[must_use]
    pub fn targets(&self) -> &'a [f64] {
        self.targets
    }

    /// The matching source, if attached.
    #[must_use]
    pub fn matching(&self) -> Option<&'a [Vec<f64>]> {
        self.matching
    }

    /// Rows with finite features and target that are available upstream.
    pub(crate) fn base_mask(&self) -> Result<ValidityMask, SplitError> {
        let mut mask = combined_validity(self.features, self.targets, None)?;
        for available in [&self.feature_availability, &self.target_availability]
            .into_iter()
            .flatten()
        {
            mask = mask.and(available)?;
        }
        Ok(mask)
    }

    /// Rows whose matching source is finite and available upstream.
    ///
    /// Callers must have checked that the matching source has one row per sample.
    pub(crate) fn matching_mask(&self, matching: &[Vec<f64>]) -> Result<ValidityMask, SplitError> {
        let mask = ValidityMask::from_rows(matching);
        match &self.matching_availability {
            Some(available) => mask.and(available),
            None => Ok(mask),
        }
    }

    fn check_availability(&self, what: &'static str, mask: &ValidityMask) -> Result<(), SplitError> {
        if mask.len() != self.n_samples() {
            return Err(SplitError::ShapeMismatch {
                what,
                expected: self.n_samples(),
                got: mask.len(),
            });
        }
        Ok(())
    }
}
