//! Validation/test set sizes derived from the training-set size.

use crate::error::SplitError;

/// Derives `n_val = n_test = min(round(n_train * frac), max)`.
///
/// Rounding is half-to-even, so `2.5` becomes `2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldoutSizing {
    frac: f64,
    max: usize,
}

impl Default for HoldoutSizing {
    fn default() -> Self {
        Self {
            frac: 0.2,
            max: 1000,
        }
    }
}

impl HoldoutSizing {
    /// Create a sizing rule.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidHoldoutFraction`] if `frac` is negative or not finite.
    pub fn new(frac: f64, max: usize) -> Result<Self, SplitError> {
        if !frac.is_finite() || frac < 0.0 {
            return Err(SplitError::InvalidHoldoutFraction { frac });
        }
        Ok(Self { frac, max })
    }

    /// Validation and test sizes for a training-set size.
    #[must_use]
    pub fn sizes(&self, n_train: usize) -> (usize, usize) {
        let n = ((n_train as f64 * self.frac).round_ties_even() as usize).min(self.max);
        (n, n)
    }
}
