//! Split file reader for the model-fitting stage.

use std::fs;
use std::path::{Path, PathBuf};

use samplecurve_split::{SplitOutcome, SplitRecord};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::IoError;

/// On-disk forms of a split file; the error form is tried first.
#[derive(Deserialize)]
#[serde(untagged)]
enum SplitDocument {
    Error { error: String },
    Split(SplitRecord),
}

/// Reads a split file written by [`SplitFileWriter`](crate::SplitFileWriter).
///
/// A document with an `error` key yields [`SplitOutcome::Insufficient`];
/// consumers must skip computation for it.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::MalformedSplitFile`] | Content is neither a split nor an error document |
pub struct SplitFileReader {
    path: PathBuf,
}

impl SplitFileReader {
    /// Create a new reader for the given split file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and classify the split file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<SplitOutcome, IoError> {
        let content = fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let document: SplitDocument =
            serde_json::from_str(&content).map_err(|e| IoError::MalformedSplitFile {
                path: self.path.clone(),
                source: e,
            })?;

        Ok(match document {
            SplitDocument::Error { error } => {
                warn!(%error, "split file marks an insufficient configuration");
                SplitOutcome::Insufficient { reason: error }
            }
            SplitDocument::Split(record) => {
                info!(
                    train = record.idx_train().len(),
                    val = record.idx_val().len(),
                    test = record.idx_test().len(),
                    "split file loaded"
                );
                SplitOutcome::Split(record)
            }
        })
    }
}
