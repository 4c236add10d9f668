//! CSV readers for numeric arrays and availability masks.

use std::fs::File;
use std::path::{Path, PathBuf};

use samplecurve_split::ValidityMask;
use tracing::{debug, info, instrument};

use crate::domain::NumericArray;
use crate::IoError;

/// Cell values read as a missing value (NaN).
const MISSING_MARKERS: [&str; 4] = ["", "NA", "NaN", "nan"];

/// Reads a numeric array from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one name per column
/// - One row per sample, all rows must have the same number of columns
/// - Empty cells and `NA`/`NaN`/`nan` are missing and read as NaN
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoColumns`] | Header has no columns |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidValue`] | Cell is neither a float nor a missing marker |
pub struct ArrayReader {
    path: PathBuf,
}

impl ArrayReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the CSV file, returning a [`NumericArray`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<NumericArray, IoError> {
        let mut rdr = open(&self.path)?;
        let columns: Vec<String> = rdr
            .headers()
            .map_err(|e| csv_error(&self.path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if columns.is_empty() {
            return Err(IoError::NoColumns {
                path: self.path.clone(),
            });
        }
        debug!(n_columns = columns.len(), "read CSV header");

        let mut rows = Vec::new();
        let mut n_missing = 0usize;
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(&self.path, e))?;
            if record.len() != columns.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: columns.len(),
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(columns.len());
            for (col_index, raw) in record.iter().enumerate() {
                let raw = raw.trim();
                if MISSING_MARKERS.contains(&raw) {
                    n_missing += 1;
                    row.push(f64::NAN);
                    continue;
                }
                let value: f64 = raw.parse().map_err(|_| IoError::InvalidValue {
                    path: self.path.clone(),
                    row_index,
                    col_index,
                    raw: raw.to_string(),
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_rows = rows.len(),
            n_columns = columns.len(),
            n_missing,
            "array loaded"
        );
        Ok(NumericArray::new(&self.path, columns, rows))
    }
}

/// Reads a single-column availability mask from a CSV file.
///
/// Cells must be `0`/`1` or `true`/`false` (any case); a header row is
/// required.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NotAVector`] | Header has other than one column |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has other than one column |
/// | [`IoError::InvalidMaskValue`] | Cell is not a boolean |
pub struct MaskReader {
    path: PathBuf,
}

impl MaskReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the CSV file, returning a [`ValidityMask`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<ValidityMask, IoError> {
        let mut rdr = open(&self.path)?;
        let n_columns = rdr.headers().map_err(|e| csv_error(&self.path, e))?.len();
        if n_columns != 1 {
            return Err(IoError::NotAVector {
                path: self.path.clone(),
                n_columns,
            });
        }

        let mut flags = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_error(&self.path, e))?;
            if record.len() != 1 {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: 1,
                    got: record.len(),
                });
            }
            let raw = record[0].trim();
            let flag = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => {
                    return Err(IoError::InvalidMaskValue {
                        path: self.path.clone(),
                        row_index,
                        raw: raw.to_string(),
                    });
                }
            };
            flags.push(flag);
        }

        if flags.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let mask = ValidityMask::from_bools(flags);
        info!(n_rows = mask.len(), n_available = mask.count(), "mask loaded");
        Ok(mask)
    }
}

// flexible(true) lets the InconsistentRowLength check fire instead of a CsvParse error.
fn open(path: &Path) -> Result<csv::Reader<File>, IoError> {
    let file = File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

fn csv_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}
