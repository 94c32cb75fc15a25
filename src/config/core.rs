use crate::clustering::overlapping::TrainingConfig;
use crate::sweep::Algorithm;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Contents of `servicecut.toml`. Every field is optional; validation
/// decides which ones a given algorithm needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawClusteringConfig {
    pub algorithm: Option<Algorithm>,
    /// Structural weight of the fused similarity.
    pub alpha: Option<SweepValues<f64>>,
    pub epsilon: Option<SweepValues<f64>>,
    pub min_samples: Option<usize>,
    pub n_clusters: Option<ClusterCountSpec>,
    pub threshold: Option<SweepValues<f64>>,
    /// One group per class (strongest affinity) instead of a threshold.
    pub hard: Option<bool>,
    pub repeats: Option<usize>,
    pub seed: Option<u64>,
    pub semantic: SemanticConfig,
    pub evaluation: EvaluationConfig,
    pub training: Option<TrainingConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Tfidf,
    Precomputed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemanticConfig {
    pub backend: Option<BackendKind>,
    /// JSON file of precomputed class vectors.
    pub vectors: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Metric names: `SM`, `ICP`, `IFN`, `NED`, `Precision`, `SR` or `SR@k`.
    pub metrics: Option<Vec<String>>,
    /// Thresholds used when `SR` is listed without one.
    pub sr_k: Option<Vec<u32>>,
    pub ground_truth: Option<PathBuf>,
}

/// A single value, an explicit list, or an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SweepValues<T> {
    One(T),
    Many(Vec<T>),
    Range(RangeSpec<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeSpec<T> {
    pub start: T,
    pub end: T,
    pub step: T,
}

impl SweepValues<f64> {
    /// Expand to concrete values. Ranges stop before `end + 0.01` and are
    /// rounded to three decimals, so `0.0..=1.0` by `0.1` ends at `1.0`.
    pub fn expand(&self) -> Vec<f64> {
        match self {
            SweepValues::One(value) => vec![*value],
            SweepValues::Many(values) => values.clone(),
            SweepValues::Range(range) => float_range(range),
        }
    }
}

impl SweepValues<usize> {
    pub fn expand(&self) -> Vec<usize> {
        match self {
            SweepValues::One(value) => vec![*value],
            SweepValues::Many(values) => values.clone(),
            SweepValues::Range(range) if range.step > 0 => {
                (range.start..=range.end).step_by(range.step).collect()
            }
            SweepValues::Range(_) => Vec::new(),
        }
    }
}

fn float_range(range: &RangeSpec<f64>) -> Vec<f64> {
    if !(range.step > 0.0) || !range.start.is_finite() || !range.end.is_finite() {
        return Vec::new();
    }
    let limit = range.end + 0.01;
    (0u32..)
        .map(|i| range.start + range.step * f64::from(i))
        .take_while(|value| *value < limit)
        .map(|value| (value * 1000.0).round() / 1000.0)
        .collect()
}

/// `n_clusters`: a count, a list, a range, or `"auto"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterCountSpec {
    Counts(SweepValues<usize>),
    Keyword(String),
}

impl RawClusteringConfig {
    /// Field-by-field overlay: values set in `overrides` win.
    pub fn merge(self, overrides: RawClusteringConfig) -> Self {
        Self {
            algorithm: overrides.algorithm.or(self.algorithm),
            alpha: overrides.alpha.or(self.alpha),
            epsilon: overrides.epsilon.or(self.epsilon),
            min_samples: overrides.min_samples.or(self.min_samples),
            n_clusters: overrides.n_clusters.or(self.n_clusters),
            threshold: overrides.threshold.or(self.threshold),
            hard: overrides.hard.or(self.hard),
            repeats: overrides.repeats.or(self.repeats),
            seed: overrides.seed.or(self.seed),
            semantic: SemanticConfig {
                backend: overrides.semantic.backend.or(self.semantic.backend),
                vectors: overrides.semantic.vectors.or(self.semantic.vectors),
            },
            evaluation: EvaluationConfig {
                metrics: overrides.evaluation.metrics.or(self.evaluation.metrics),
                sr_k: overrides.evaluation.sr_k.or(self.evaluation.sr_k),
                ground_truth: overrides
                    .evaluation
                    .ground_truth
                    .or(self.evaluation.ground_truth),
            },
            training: overrides.training.or(self.training),
        }
    }
}
