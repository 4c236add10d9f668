//! The split record handed to the model-fitting stage.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// Tag written in place of a split when a configuration lacks data.
pub const INSUFFICIENT_SAMPLES: &str = "insufficient samples";

/// Train/validation/test row indices for one (dataset, size, seed, policy)
/// configuration.
///
/// Indices are original-space row numbers. Records are built once by the
/// splitters and never modified afterwards; consumers only read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    idx_train: Vec<usize>,
    idx_val: Vec<usize>,
    idx_test: Vec<usize>,
    samplesize: usize,
    seed: u64,
    stratify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    average_matching_score: Option<f64>,
}

impl SplitRecord {
    pub(crate) fn new(
        idx_train: Vec<usize>,
        idx_val: Vec<usize>,
        idx_test: Vec<usize>,
        seed: u64,
        stratify: bool,
    ) -> Self {
        let samplesize = idx_train.len();
        Self {
            idx_train,
            idx_val,
            idx_test,
            samplesize,
            seed,
            stratify,
            average_matching_score: None,
        }
    }

    /// Replace the three sets with case+control sets and double the sample size.
    pub(crate) fn with_matched_controls(
        self,
        idx_train: Vec<usize>,
        idx_val: Vec<usize>,
        idx_test: Vec<usize>,
        average_matching_score: f64,
    ) -> Self {
        Self {
            idx_train,
            idx_val,
            idx_test,
            samplesize: self.samplesize * 2,
            average_matching_score: Some(average_matching_score),
            ..self
        }
    }

    /// Sort every index set ascending.
    pub(crate) fn sorted(mut self) -> Self {
        self.idx_train.sort_unstable();
        self.idx_val.sort_unstable();
        self.idx_test.sort_unstable();
        self
    }

    /// Training row indices.
    #[must_use]
    pub fn idx_train(&self) -> &[usize] {
        &self.idx_train
    }

    /// Validation row indices.
    #[must_use]
    pub fn idx_val(&self) -> &[usize] {
        &self.idx_val
    }

    /// Test row indices.
    #[must_use]
    pub fn idx_test(&self) -> &[usize] {
        &self.idx_test
    }

    /// Training-set size this record represents (cases plus controls for matched splits).
    #[must_use]
    pub fn samplesize(&self) -> usize {
        self.samplesize
    }

    /// Seed used for every random decision behind this record.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether class-stratified sampling was used.
    #[must_use]
    pub fn stratify(&self) -> bool {
        self.stratify
    }

    /// Mean squared standardized case/control distance, for matched splits only.
    #[must_use]
    pub fn average_matching_score(&self) -> Option<f64> {
        self.average_matching_score
    }

    /// The three sets paired with their serialized names.
    #[must_use]
    pub fn sets(&self) -> [(&'static str, &[usize]); 3] {
        [
            ("idx_train", &self.idx_train),
            ("idx_val", &self.idx_val),
            ("idx_test", &self.idx_test),
        ]
    }

    /// Check that every referenced row exists, has finite features and target,
    /// and appears in only one set.
    ///
    /// This re-checks the record against the data; it never re-derives the split.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::PostconditionViolated`] naming the first bad row.
    pub fn verify_rows(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), SplitError> {
        let mut seen = HashSet::new();
        for (set, indices) in self.sets() {
            for &index in indices {
                let violation = |reason| SplitError::PostconditionViolated { set, index, reason };
                if !seen.insert(index) {
                    return Err(violation("was already selected"));
                }
                let (Some(row), Some(target)) = (features.get(index), targets.get(index)) else {
                    return Err(violation("is out of range"));
                };
                if !row.iter().all(|v| v.is_finite()) {
                    return Err(violation("has non-finite features"));
                }
                if !target.is_finite() {
                    return Err(violation("has a non-finite target"));
                }
            }
        }
        Ok(())
    }
}

/// Result of split generation for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitOutcome {
    /// A usable split.
    Split(SplitRecord),
    /// Not enough data for the requested sizes; downstream work is skipped.
    Insufficient {
        /// Diagnostic description; serialized documents only carry
        /// [`INSUFFICIENT_SAMPLES`].
        reason: String,
    },
}

impl SplitOutcome {
    /// The split record, if one was produced.
    #[must_use]
    pub fn record(&self) -> Option<&SplitRecord> {
        match self {
            SplitOutcome::Split(record) => Some(record),
            SplitOutcome::Insufficient { .. } => None,
        }
    }

    /// Whether this configuration was skipped for lack of data.
    #[must_use]
    pub fn is_insufficient(&self) -> bool {
        matches!(self, SplitOutcome::Insufficient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SplitRecord {
        SplitRecord::new(vec![3, 0], vec![2], vec![1], 7, false)
    }

    #[test]
    fn samplesize_tracks_train_len() {
        let r = record();
        assert_eq!(r.samplesize(), 2);
        assert_eq!(r.seed(), 7);
        assert_eq!(r.average_matching_score(), None);
    }

    #[test]
    fn matched_controls_double_samplesize() {
        let r = record().with_matched_controls(vec![3, 0, 5, 6], vec![2, 7], vec![1, 8], 0.25);
        assert_eq!(r.samplesize(), 4);
        assert_eq!(r.idx_train(), &[3, 0, 5, 6]);
        assert_eq!(r.average_matching_score(), Some(0.25));
        assert_eq!(r.seed(), 7);
    }

    #[test]
    fn sorted_orders_each_set() {
        let r = record().sorted();
        assert_eq!(r.idx_train(), &[0, 3]);
    }

    #[test]
    fn verify_rows_flags_non_finite_target() {
        let features = vec![vec![0.0]; 4];
        let targets = vec![0.0, 1.0, f64::NAN, 0.0];
        let err = record().verify_rows(&features, &targets).unwrap_err();
        assert!(matches!(
            err,
            SplitError::PostconditionViolated {
                set: "idx_val",
                index: 2,
                ..
            }
        ));
    }

    #[test]
    fn verify_rows_flags_out_of_range() {
        let features = vec![vec![0.0]; 3];
        let targets = vec![0.0; 3];
        let err = record().verify_rows(&features, &targets).unwrap_err();
        assert!(matches!(
            err,
            SplitError::PostconditionViolated { index: 3, .. }
        ));
    }

    #[test]
    fn verify_rows_flags_overlapping_sets() {
        let features = vec![vec![0.0]; 4];
        let targets = vec![0.0; 4];
        let overlapping: SplitRecord = serde_json::from_str(
            r#"{"idx_train":[0,1],"idx_val":[1],"idx_test":[2],"samplesize":2,"seed":0,"stratify":false}"#,
        )
        .unwrap();
        let err = overlapping.verify_rows(&features, &targets).unwrap_err();
        assert!(matches!(
            err,
            SplitError::PostconditionViolated {
                set: "idx_val",
                index: 1,
                ..
            }
        ));

        let repeated = SplitRecord::new(vec![3, 3], vec![], vec![], 0, false);
        assert!(repeated.verify_rows(&features, &targets).is_err());
        record().verify_rows(&features, &targets).unwrap();
    }

    #[test]
    fn serialized_fields_omit_absent_matching_score() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["samplesize"], 2);
        assert!(json.get("average_matching_score").is_none());

        let matched = record().with_matched_controls(vec![0, 1], vec![], vec![], 1.5);
        let json = serde_json::to_value(matched).unwrap();
        assert_eq!(json["average_matching_score"], 1.5);
    }
}
