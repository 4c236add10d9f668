//! Row validity masks built from per-source finiteness.

use crate::error::SplitError;

/// Boolean vector flagging which rows are usable for a computation.
///
/// `mask.get(i)` is `true` iff every source the mask was built from has
/// finite values at row `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask(Vec<bool>);

impl ValidityMask {
    /// A mask with every one of `n` rows usable.
    #[must_use]
    pub fn full(n: usize) -> Self {
        Self(vec![true; n])
    }

    /// Wrap an explicit availability vector (e.g. rows rejected upstream).
    #[must_use]
    pub fn from_bools(flags: Vec<bool>) -> Self {
        Self(flags)
    }

    /// Mask of rows whose scalar value is finite.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        Self(values.iter().map(|v| v.is_finite()).collect())
    }

    /// Mask of rows whose every column is finite.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        Self(
            rows.iter()
                .map(|row| row.iter().all(|v| v.is_finite()))
                .collect(),
        )
    }

    /// Mask of rows with `labels[i] == label`, restricted to this mask.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::ShapeMismatch`] if `labels` has a different length.
    pub fn where_label(&self, labels: &[f64], label: f64) -> Result<Self, SplitError> {
        self.check_len("labels", labels.len())?;
        Ok(Self(
            self.0
                .iter()
                .zip(labels)
                .map(|(&keep, &y)| keep && y == label)
                .collect(),
        ))
    }

    /// Logical AND of two masks.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::ShapeMismatch`] if the masks differ in length.
    pub fn and(&self, other: &ValidityMask) -> Result<Self, SplitError> {
        self.check_len("mask", other.len())?;
        Ok(Self(
            self.0.iter().zip(&other.0).map(|(&a, &b)| a && b).collect(),
        ))
    }

    /// Clear the given rows, returning the updated mask.
    #[must_use]
    pub fn without(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        for row in rows {
            if let Some(flag) = self.0.get_mut(row) {
                *flag = false;
            }
        }
        self
    }

    /// Whether row `i` is usable. Out-of-range rows are not.
    #[must_use]
    pub fn get(&self, i: usize) -> bool {
        self.0.get(i).copied().unwrap_or(false)
    }

    /// Number of rows covered by the mask.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mask covers zero rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of usable rows.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    /// Usable row indices in ascending order.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }

    /// Borrow the underlying flags.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub(crate) fn check_len(&self, what: &'static str, got: usize) -> Result<(), SplitError> {
        if got != self.0.len() {
            return Err(SplitError::ShapeMismatch {
                what,
                expected: self.0.len(),
                got,
            });
        }
        Ok(())
    }
}

/// Conjoin per-source finiteness masks of equal row count.
///
/// Vector-valued sources require all columns finite.
///
/// # Errors
///
/// Returns [`SplitError::ShapeMismatch`] if the sources disagree in row count.
pub fn combined_validity(
    features: &[Vec<f64>],
    targets: &[f64],
    matching: Option<&[Vec<f64>]>,
) -> Result<ValidityMask, SplitError> {
    let mut mask = ValidityMask::from_rows(features);
    mask.check_len("targets", targets.len())?;
    mask = mask.and(&ValidityMask::from_values(targets))?;
    if let Some(rows) = matching {
        mask.check_len("matching source", rows.len())?;
        mask = mask.and(&ValidityMask::from_rows(rows))?;
    }
    Ok(mask)
}
