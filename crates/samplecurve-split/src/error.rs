use crate::classes::ClassCount;
use crate::policy::SamplingPolicy;

/// Errors from mask construction and split generation.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// Returned when two per-row sources disagree in row count.
    #[error("{what} has {got} rows, expected {expected}")]
    ShapeMismatch {
        /// Which source had the wrong length.
        what: &'static str,
        /// The expected number of rows.
        expected: usize,
        /// The actual number of rows.
        got: usize,
    },

    /// Returned when a sampling policy name is not recognized.
    #[error("unknown sampling policy \"{name}\" (expected none, balanced, or matched)")]
    UnknownPolicy {
        /// The unrecognized name.
        name: String,
    },

    /// Returned when `n_train` is too small for the sampling policy.
    #[error("n_train of {n_train} is too small for the sampling policy")]
    InvalidSampleSize {
        /// The invalid n_train value provided.
        n_train: usize,
    },

    /// Returned when a hold-out fraction is negative or not finite.
    #[error("hold-out fraction must be finite and non-negative, got {frac}")]
    InvalidHoldoutFraction {
        /// The invalid fraction provided.
        frac: f64,
    },

    /// Returned when the masked population cannot cover the requested sizes.
    #[error("requested {requested} samples but only {available} are available")]
    InsufficientSamples {
        /// Total number of rows requested across all partitions.
        requested: usize,
        /// Number of usable rows.
        available: usize,
    },

    /// Returned when a class is too small to appear in every stratified partition.
    #[error("class {class} has only {count} members, need at least {required} for a stratified split")]
    InsufficientClassCount {
        /// The class label with insufficient members.
        class: f64,
        /// The number of members of that class.
        count: usize,
        /// The number of non-empty partitions drawing from the class.
        required: usize,
    },

    /// Returned when undersampling finds fewer than two classes.
    #[error("class balancing needs at least 2 classes, found {n_classes}")]
    DegenerateClasses {
        /// Number of distinct classes among masked rows.
        n_classes: usize,
    },

    /// Returned when the class structure cannot be used by the chosen policy.
    #[error("{policy} sampling cannot use class structure {class_counts:?}: {reason}")]
    ImbalancedData {
        /// The sampling policy that rejected the data.
        policy: SamplingPolicy,
        /// Per-class member counts among the masked rows.
        class_counts: Vec<ClassCount>,
        /// Human-readable description of the problem.
        reason: &'static str,
    },

    /// Returned when the matching source is missing or does not align with the population.
    #[error("invalid matching source: {reason} (population has {n_samples} rows)")]
    InvalidMatchingSource {
        /// Human-readable description of the problem.
        reason: String,
        /// Number of rows in the population.
        n_samples: usize,
    },

    /// Returned when a matched control breaks a matching contract.
    #[error("matching invariant violated for control {control} (case {case}): {reason}")]
    MatchingInvariantViolated {
        /// The case being matched.
        case: usize,
        /// The control that was assigned.
        control: usize,
        /// Which contract was broken.
        reason: &'static str,
    },

    /// Returned when an emitted index refers to a row that is not fully usable.
    #[error("post-condition violated: {set} contains row {index}, which {reason}")]
    PostconditionViolated {
        /// Name of the offending index set.
        set: &'static str,
        /// The offending original-space row index.
        index: usize,
        /// What is wrong with the row.
        reason: &'static str,
    },
}
