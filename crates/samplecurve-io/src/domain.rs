//! Domain types for samplecurve-io.

use std::path::{Path, PathBuf};

use crate::IoError;

/// A validated dataset name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetName(String);

impl DatasetName {
    /// Parse and validate a dataset name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidDatasetName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidDatasetName { name });
        }
        Ok(Self(name))
    }

    /// Return the dataset name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatasetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row-major numeric array read from a CSV file.
///
/// Produced by [`ArrayReader`](crate::ArrayReader). Missing cells hold NaN;
/// `rows[i][j]` is the value of column `columns[j]` in row `i`.
#[derive(Debug, Clone)]
pub struct NumericArray {
    path: PathBuf,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl NumericArray {
    pub(crate) fn new(path: &Path, columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self {
            path: path.to_path_buf(),
            columns,
            rows,
        }
    }

    /// Return the column names from the CSV header.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return the values, one `Vec` per row.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of data rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Consume the array, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    /// Flatten a single-column array into a vector.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::NotAVector`] if the array has more than one column.
    pub fn column_vector(&self) -> Result<Vec<f64>, IoError> {
        if self.columns.len() != 1 {
            return Err(IoError::NotAVector {
                path: self.path.clone(),
                n_columns: self.columns.len(),
            });
        }
        Ok(self.rows.iter().map(|row| row[0]).collect())
    }
}
