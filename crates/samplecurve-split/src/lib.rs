//! Train/validation/test partitioning for sample-size scaling studies.
//!
//! Pure computation, zero I/O. Builds row validity masks from feature,
//! target and matching sources, then splits the usable rows under one of
//! three policies: plain random sampling, class-balanced undersampling, or
//! greedy nearest-neighbour case/control matching. Every random decision
//! for one configuration comes from a single generator seeded by the
//! configuration's seed.

mod balance;
mod classes;
mod error;
mod inputs;
mod mask;
mod matched;
mod policy;
mod random;
mod record;
mod sizing;

pub use balance::BalancedResampler;
pub use classes::{ClassCount, class_counts};
pub use error::SplitError;
pub use inputs::SplitInputs;
pub use mask::{ValidityMask, combined_validity};
pub use matched::{MatchedSplitter, StandardizedMatching};
pub use policy::{MAX_STRATIFY_CLASSES, SamplingPolicy, SplitConfig};
pub use random::RandomSplitter;
pub use record::{INSUFFICIENT_SAMPLES, SplitOutcome, SplitRecord};
pub use sizing::HoldoutSizing;
