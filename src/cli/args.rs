use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{
    ClusterCountSpec, EvaluationConfig, RawClusteringConfig, SemanticConfig, SweepValues,
};
use crate::sweep::Algorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    /// Hard clustering of the fused distance matrix
    Density,
    /// Fuzzy c-means over an MDS embedding
    Fuzzy,
    /// Overlapping groups from a graph neural network
    OverlappingGnn,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Density => Algorithm::Density,
            AlgorithmArg::Fuzzy => Algorithm::Fuzzy,
            AlgorithmArg::OverlappingGnn => Algorithm::OverlappingGnn,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "servicecut")]
#[command(about = "Microservice candidate extraction and scoring for class graphs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long, default_value_t = 0, global = true)]
    pub jobs: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cluster classes into candidate microservices and score every sweep point
    Cluster {
        /// Parser output (JSON object of classes)
        classes: PathBuf,

        #[command(flatten)]
        overrides: ClusterOverrides,

        /// Configuration file (defaults to ./servicecut.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Report file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a summary table on stderr
        #[arg(long)]
        summary: bool,
    },

    /// Score a ground-truth decomposition with the structural metrics
    Evaluate {
        /// Parser output (JSON object of classes)
        classes: PathBuf,

        /// Mapping JSON, project directory, or cluster listing
        #[arg(short, long = "ground-truth")]
        ground_truth: PathBuf,

        /// Metrics to compute (comma-separated; defaults to SM,ICP,IFN,NED)
        #[arg(long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recompute metrics for the groupings of an existing report
    Rescore {
        /// Parser output (JSON object of classes)
        classes: PathBuf,

        /// Report written by `cluster`
        report: PathBuf,

        /// Ground truth for Precision and SR
        #[arg(short, long = "ground-truth")]
        ground_truth: Option<PathBuf>,

        /// Metrics to compute (comma-separated)
        #[arg(long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,

        /// SR thresholds used when `SR` is listed without one
        #[arg(long = "sr-k", value_delimiter = ',')]
        sr_k: Option<Vec<u32>>,

        /// Output file (defaults to overwriting the report)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Flags that override `servicecut.toml` field by field.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ClusterOverrides {
    /// Clustering strategy
    #[arg(short, long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Structural weights to sweep (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub alpha: Option<Vec<f64>>,

    /// Density radii to sweep (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub epsilon: Option<Vec<f64>>,

    /// Density core size
    #[arg(long = "min-samples")]
    pub min_samples: Option<usize>,

    /// Group counts to sweep (comma-separated)
    #[arg(short = 'k', long = "n-clusters", value_delimiter = ',')]
    pub n_clusters: Option<Vec<usize>>,

    /// Membership thresholds to sweep (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub threshold: Option<Vec<f64>>,

    /// Keep only each class's strongest group
    #[arg(long)]
    pub hard: bool,

    /// Fuzzy runs averaged per sweep point
    #[arg(long)]
    pub repeats: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Metrics to compute (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub metrics: Option<Vec<String>>,

    /// SR thresholds used when `SR` is listed without one
    #[arg(long = "sr-k", value_delimiter = ',')]
    pub sr_k: Option<Vec<u32>>,

    /// Ground truth for Precision and SR
    #[arg(short, long = "ground-truth")]
    pub ground_truth: Option<PathBuf>,

    /// Precomputed class vectors (JSON) replacing TF-IDF
    #[arg(long)]
    pub vectors: Option<PathBuf>,
}

fn sweep<T>(values: Option<Vec<T>>) -> Option<SweepValues<T>> {
    values.map(|mut values| {
        if values.len() == 1 {
            SweepValues::One(values.remove(0))
        } else {
            SweepValues::Many(values)
        }
    })
}

impl ClusterOverrides {
    /// The overrides as a sparse config, ready for `RawClusteringConfig::merge`.
    pub fn to_raw(&self) -> RawClusteringConfig {
        let overrides = self.clone();
        RawClusteringConfig {
            algorithm: overrides.algorithm.map(Algorithm::from),
            alpha: sweep(overrides.alpha),
            epsilon: sweep(overrides.epsilon),
            min_samples: overrides.min_samples,
            n_clusters: sweep(overrides.n_clusters).map(ClusterCountSpec::Counts),
            threshold: sweep(overrides.threshold),
            hard: overrides.hard.then_some(true),
            repeats: overrides.repeats,
            seed: overrides.seed,
            semantic: SemanticConfig {
                backend: None,
                vectors: overrides.vectors,
            },
            evaluation: EvaluationConfig {
                metrics: overrides.metrics,
                sr_k: overrides.sr_k,
                ground_truth: overrides.ground_truth,
            },
            training: None,
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
