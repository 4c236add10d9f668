//! JSON split file writer.

use std::fs;
use std::path::{Path, PathBuf};

use samplecurve_split::{INSUFFICIENT_SAMPLES, SamplingPolicy, SplitOutcome, SplitRecord};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::DatasetName;
use crate::IoError;

/// Writes one split file per (policy, sample size, seed) configuration.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{dataset}_{policy}_n{n_train}_s{seed}_split.json`,
/// where `n_train` is the requested training-set size.
pub struct SplitFileWriter {
    output_dir: PathBuf,
    dataset: DatasetName,
}

impl SplitFileWriter {
    /// Create a new writer targeting the given directory and dataset name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), dataset = %dataset))]
    pub fn new(output_dir: &Path, dataset: DatasetName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            dataset,
        })
    }

    /// Return the path of the split file for one configuration.
    ///
    /// Does not write anything.
    #[must_use]
    pub fn split_path(&self, policy: SamplingPolicy, n_train: usize, seed: u64) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_n{}_s{}_split.json",
            self.dataset.as_str(),
            policy,
            n_train,
            seed
        ))
    }

    /// Write `outcome` to the split file for one configuration.
    ///
    /// A split becomes the index-set document; an insufficiency becomes
    /// `{"error": "insufficient samples"}` and nothing else.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The document cannot be encoded |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(policy = %policy, n_train = n_train, seed = seed))]
    pub fn write(
        &self,
        policy: SamplingPolicy,
        n_train: usize,
        seed: u64,
        outcome: &SplitOutcome,
    ) -> Result<PathBuf, IoError> {
        let path = self.split_path(policy, n_train, seed);
        let json = match outcome {
            SplitOutcome::Split(record) => to_json(&path, &SplitArtifact::from(record))?,
            SplitOutcome::Insufficient { .. } => to_json(
                &path,
                &ErrorArtifact {
                    error: INSUFFICIENT_SAMPLES,
                },
            )?,
        };
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(
            path = %path.display(),
            insufficient = outcome.is_insufficient(),
            "split file written"
        );
        Ok(path)
    }
}

fn to_json<T: Serialize>(path: &Path, artifact: &T) -> Result<String, IoError> {
    serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct SplitArtifact<'a> {
    idx_train: &'a [usize],
    idx_val: &'a [usize],
    idx_test: &'a [usize],
    samplesize: usize,
    seed: u64,
    stratify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_matching_score: Option<f64>,
}

impl<'a> From<&'a SplitRecord> for SplitArtifact<'a> {
    fn from(record: &'a SplitRecord) -> Self {
        Self {
            idx_train: record.idx_train(),
            idx_val: record.idx_val(),
            idx_test: record.idx_test(),
            samplesize: record.samplesize(),
            seed: record.seed(),
            stratify: record.stratify(),
            average_matching_score: record.average_matching_score(),
        }
    }
}

#[derive(Serialize)]
struct ErrorArtifact {
    error: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use samplecurve_split::{SplitConfig, SplitInputs};
    use tempfile::TempDir;

    fn outcome(policy: SamplingPolicy, n_train: usize) -> SplitOutcome {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect();
        let m: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 7) as f64]).collect();
        let inputs = SplitInputs::new(&x, &y).unwrap().with_matching(&m);
        SplitConfig::new(n_train, 2, 2)
            .unwrap()
            .with_policy(policy)
            .with_seed(3)
            .generate(&inputs)
            .unwrap()
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn split_file_naming() {
        let dir = TempDir::new().unwrap();
        let writer = SplitFileWriter::new(dir.path(), DatasetName::new("ukb".into()).unwrap()).unwrap();
        assert_eq!(
            writer.split_path(SamplingPolicy::Balanced, 500, 7),
            dir.path().join("ukb_balanced_n500_s7_split.json")
        );
    }

    #[test]
    fn write_split_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = SplitFileWriter::new(dir.path(), DatasetName::new("toy".into()).unwrap()).unwrap();
        let path = writer
            .write(SamplingPolicy::None, 10, 3, &outcome(SamplingPolicy::None, 10))
            .unwrap();
        assert!(path.exists());

        let content = read_json(&path);
        assert_eq!(content["idx_train"].as_array().unwrap().len(), 10);
        assert_eq!(content["idx_val"].as_array().unwrap().len(), 2);
        assert_eq!(content["idx_test"].as_array().unwrap().len(), 2);
        assert_eq!(content["samplesize"], 10);
        assert_eq!(content["seed"], 3);
        assert_eq!(content["stratify"], false);
        assert!(content.get("average_matching_score").is_none());
        assert!(content.get("error").is_none());
    }

    #[test]
    fn write_matched_includes_score() {
        let dir = TempDir::new().unwrap();
        let writer = SplitFileWriter::new(dir.path(), DatasetName::new("toy".into()).unwrap()).unwrap();
        let path = writer
            .write(SamplingPolicy::Matched, 4, 3, &outcome(SamplingPolicy::Matched, 4))
            .unwrap();

        let content = read_json(&path);
        assert_eq!(content["samplesize"], 4);
        assert!(content["average_matching_score"].is_number());
    }

    #[test]
    fn write_insufficient_is_error_only() {
        let dir = TempDir::new().unwrap();
        let writer = SplitFileWriter::new(dir.path(), DatasetName::new("toy".into()).unwrap()).unwrap();
        let insufficient = outcome(SamplingPolicy::None, 100);
        assert!(insufficient.is_insufficient());
        let path = writer.write(SamplingPolicy::None, 100, 3, &insufficient).unwrap();

        let content = read_json(&path);
        let object = content.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(content["error"], "insufficient samples");
    }

    #[test]
    fn write_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let writer = SplitFileWriter::new(&nested, DatasetName::new("toy".into()).unwrap()).unwrap();
        writer
            .write(SamplingPolicy::None, 10, 0, &outcome(SamplingPolicy::None, 10))
            .unwrap();
        assert!(nested.join("toy_none_n10_s0_split.json").exists());
    }
}
