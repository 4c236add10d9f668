use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use samplecurve_io::{ArrayReader, DatasetName, MaskReader, SplitFileReader, SplitFileWriter};
use samplecurve_split::{HoldoutSizing, SamplingPolicy, SplitConfig, SplitInputs, ValidityMask};

#[derive(Parser)]
#[command(name = "samplecurve")]
#[command(about = "Train/validation/test split generation for sample-size scaling studies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility (first seed of a sweep)
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel sweeps (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input arrays and their upstream availability masks.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the feature CSV (header row, one column per feature)
    #[arg(long)]
    features: PathBuf,

    /// Path to the single-column target CSV
    #[arg(long)]
    targets: PathBuf,

    /// Path to the matching (confound) CSV, required for matched sampling
    #[arg(long)]
    matching: Option<PathBuf>,

    /// Availability mask for the features (one column of 0/1)
    #[arg(long)]
    features_mask: Option<PathBuf>,

    /// Availability mask for the targets (one column of 0/1)
    #[arg(long)]
    targets_mask: Option<PathBuf>,

    /// Availability mask for the matching source (one column of 0/1)
    #[arg(long)]
    matching_mask: Option<PathBuf>,
}

/// Shared split parameters.
#[derive(Args, Debug, Clone)]
struct SplitArgs {
    /// Sampling policy: "none", "balanced", or "matched"
    #[arg(long, default_value = "none")]
    policy: String,

    /// Stratify by class (ignored for continuous targets)
    #[arg(long, default_value_t = false)]
    stratify: bool,

    /// Validation and test size as a fraction of the training size
    #[arg(long, default_value_t = 0.2)]
    val_test_frac: f64,

    /// Upper bound on the validation and test sizes
    #[arg(long, default_value_t = 1000)]
    val_test_max: usize,

    /// Dataset name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    dataset: String,

    /// Output directory for split files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the split for one training size and seed
    Split {
        #[command(flatten)]
        data: DataArgs,

        /// Training-set size
        #[arg(long)]
        n_train: usize,

        #[command(flatten)]
        split: SplitArgs,
    },

    /// Generate splits for every combination of training size and seed
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Comma-separated training-set sizes
        #[arg(long, value_delimiter = ',', required = true)]
        sizes: Vec<usize>,

        /// Number of consecutive seeds per size, starting at --seed
        #[arg(long, default_value_t = 1)]
        n_seeds: u64,

        #[command(flatten)]
        split: SplitArgs,
    },

    /// Check that a split file references only usable rows of the data
    Verify {
        /// Path to the split file
        #[arg(long)]
        split: PathBuf,

        /// Path to the feature CSV
        #[arg(long)]
        features: PathBuf,

        /// Path to the single-column target CSV
        #[arg(long)]
        targets: PathBuf,
    },
}

// --- Stdout summaries ---

#[derive(Serialize)]
struct SplitOutput {
    dataset: String,
    policy: SamplingPolicy,
    seed: u64,
    n_train: usize,
    n_val: usize,
    n_test: usize,
    insufficient: bool,
    samplesize: Option<usize>,
    average_matching_score: Option<f64>,
    path: PathBuf,
}

#[derive(Serialize)]
struct SweepOutput {
    dataset: String,
    policy: SamplingPolicy,
    n_configurations: usize,
    n_insufficient: usize,
    results: Vec<SweepEntry>,
}

#[derive(Serialize)]
struct SweepEntry {
    n_train: usize,
    seed: u64,
    insufficient: bool,
    path: PathBuf,
}

#[derive(Serialize)]
struct VerifyOutput {
    split: PathBuf,
    insufficient: bool,
    n_train: usize,
    n_val: usize,
    n_test: usize,
}

/// Arrays read from disk; borrowed by [`SplitInputs`].
struct LoadedData {
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
    matching: Option<Vec<Vec<f64>>>,
    features_mask: Option<ValidityMask>,
    targets_mask: Option<ValidityMask>,
    matching_mask: Option<ValidityMask>,
}

impl LoadedData {
    fn inputs(&self) -> Result<SplitInputs<'_>> {
        let mut inputs = SplitInputs::new(&self.features, &self.targets)
            .context("features and targets disagree in row count")?;
        if let Some(matching) = &self.matching {
            inputs = inputs.with_matching(matching);
        }
        if let Some(mask) = &self.features_mask {
            inputs = inputs.with_feature_availability(mask.clone())?;
        }
        if let Some(mask) = &self.targets_mask {
            inputs = inputs.with_target_availability(mask.clone())?;
        }
        if let Some(mask) = &self.matching_mask {
            inputs = inputs.with_matching_availability(mask.clone())?;
        }
        Ok(inputs)
    }
}

fn read_matrix(path: &Path, what: &str) -> Result<Vec<Vec<f64>>> {
    Ok(ArrayReader::new(path)
        .read()
        .with_context(|| format!("failed to read {what} CSV"))?
        .into_rows())
}

fn read_vector(path: &Path, what: &str) -> Result<Vec<f64>> {
    ArrayReader::new(path)
        .read()
        .with_context(|| format!("failed to read {what} CSV"))?
        .column_vector()
        .with_context(|| format!("{what} must be a single column"))
}

fn read_mask(path: Option<&PathBuf>, what: &str) -> Result<Option<ValidityMask>> {
    path.map(|p| {
        MaskReader::new(p)
            .read()
            .with_context(|| format!("failed to read {what} mask"))
    })
    .transpose()
}

fn load_data(args: &DataArgs) -> Result<LoadedData> {
    let data = LoadedData {
        features: read_matrix(&args.features, "features")?,
        targets: read_vector(&args.targets, "targets")?,
        matching: args
            .matching
            .as_deref()
            .map(|p| read_matrix(p, "matching"))
            .transpose()?,
        features_mask: read_mask(args.features_mask.as_ref(), "features")?,
        targets_mask: read_mask(args.targets_mask.as_ref(), "targets")?,
        matching_mask: read_mask(args.matching_mask.as_ref(), "matching")?,
    };
    info!(
        n_samples = data.targets.len(),
        n_features = data.features.first().map_or(0, Vec::len),
        matching = data.matching.is_some(),
        "data loaded"
    );
    Ok(data)
}

/// Build the config for one (size, seed) pair.
fn build_config(
    policy: SamplingPolicy,
    sizing: &HoldoutSizing,
    stratify: bool,
    n_train: usize,
    seed: u64,
) -> Result<SplitConfig> {
    let (n_val, n_test) = sizing.sizes(n_train);
    Ok(SplitConfig::new(n_train, n_val, n_test)?
        .with_policy(policy)
        .with_stratify(stratify)
        .with_seed(seed))
}

/// Every (size, seed) pair of a sweep, each size once.
fn sweep_jobs(sizes: &[usize], first_seed: u64, n_seeds: u64) -> Result<Vec<(usize, u64)>> {
    let mut sizes = sizes.to_vec();
    sizes.sort_unstable();
    sizes.dedup();

    let seeds = (0..n_seeds)
        .map(|i| {
            first_seed
                .checked_add(i)
                .with_context(|| format!("seed range starting at {first_seed} overflows u64"))
        })
        .collect::<Result<Vec<u64>>>()?;

    Ok(sizes
        .iter()
        .flat_map(|&n| seeds.iter().map(move |&seed| (n, seed)))
        .collect())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Split {
            data,
            n_train,
            split,
        } => {
            let policy: SamplingPolicy = split.policy.parse()?;
            let sizing = HoldoutSizing::new(split.val_test_frac, split.val_test_max)?;
            let dataset = DatasetName::new(split.dataset.clone())?;

            let loaded = load_data(&data)?;
            let inputs = loaded.inputs()?;
            let config = build_config(policy, &sizing, split.stratify, n_train, cli.seed)?;
            let outcome = config
                .generate(&inputs)
                .context("split generation failed")?;

            let writer = SplitFileWriter::new(&split.output_dir, dataset)?;
            let path = writer.write(policy, n_train, cli.seed, &outcome)?;

            let record = outcome.record();
            let output = SplitOutput {
                dataset: split.dataset,
                policy,
                seed: cli.seed,
                n_train: config.n_train(),
                n_val: config.n_val(),
                n_test: config.n_test(),
                insufficient: outcome.is_insufficient(),
                samplesize: record.map(|r| r.samplesize()),
                average_matching_score: record.and_then(|r| r.average_matching_score()),
                path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Sweep {
            data,
            sizes,
            n_seeds,
            split,
        } => {
            let policy: SamplingPolicy = split.policy.parse()?;
            let sizing = HoldoutSizing::new(split.val_test_frac, split.val_test_max)?;
            let dataset = DatasetName::new(split.dataset.clone())?;

            let loaded = load_data(&data)?;
            let inputs = loaded.inputs()?;
            let writer = SplitFileWriter::new(&split.output_dir, dataset)?;

            let jobs = sweep_jobs(&sizes, cli.seed, n_seeds)?;
            info!(n_configurations = jobs.len(), "sweep started");

            let results = jobs
                .par_iter()
                .map(|&(n_train, seed)| -> Result<SweepEntry> {
                    let config = build_config(policy, &sizing, split.stratify, n_train, seed)?;
                    let outcome = config.generate(&inputs).with_context(|| {
                        format!("split generation failed for n_train={n_train}, seed={seed}")
                    })?;
                    let path = writer.write(policy, n_train, seed, &outcome)?;
                    Ok(SweepEntry {
                        n_train,
                        seed,
                        insufficient: outcome.is_insufficient(),
                        path,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let n_insufficient = results.iter().filter(|r| r.insufficient).count();
            info!(
                n_configurations = results.len(),
                n_insufficient, "sweep complete"
            );

            let output = SweepOutput {
                dataset: split.dataset,
                policy,
                n_configurations: results.len(),
                n_insufficient,
                results,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Verify {
            split,
            features,
            targets,
        } => {
            let outcome = SplitFileReader::new(&split)
                .read()
                .context("failed to read split file")?;

            let output = match outcome.record() {
                None => {
                    info!("configuration marked insufficient, nothing to verify");
                    VerifyOutput {
                        split,
                        insufficient: true,
                        n_train: 0,
                        n_val: 0,
                        n_test: 0,
                    }
                }
                Some(record) => {
                    let features = read_matrix(&features, "features")?;
                    let targets = read_vector(&targets, "targets")?;
                    record
                        .verify_rows(&features, &targets)
                        .context("split file does not match the data")?;
                    info!("split file verified");
                    VerifyOutput {
                        n_train: record.idx_train().len(),
                        n_val: record.idx_val().len(),
                        n_test: record.idx_test().len(),
                        split,
                        insufficient: false,
                    }
                }
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
