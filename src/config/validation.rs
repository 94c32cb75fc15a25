//! Validation with issue accumulation.
//!
//! A raw configuration becomes a [`ClusteringRequest`] only when every rule
//! passes. Rules never stop at the first problem: each one reports its own
//! issues and all of them are returned together, addressed by field path.

use std::str::FromStr;

use stillwater::{NonEmptyVec, Validation};

use super::core::{
    BackendKind, ClusterCountSpec, EvaluationConfig, RangeSpec, RawClusteringConfig, SweepValues,
};
use crate::clustering::overlapping::TrainingConfig;
use crate::clustering::Discretization;
use crate::errors::{ConfigIssue, Error, Result};
use crate::evaluation::Metric;
use crate::graph::GroundTruthSource;
use crate::similarity::SemanticSource;
use crate::sweep::{Algorithm, ClusterCounts, ClusteringRequest};

pub type ConfigValidation<T> = Validation<T, NonEmptyVec<ConfigIssue>>;

const DEFAULT_ALPHA: f64 = 0.5;
const DEFAULT_SEED: u64 = 42;

pub fn validation_success<T>(value: T) -> ConfigValidation<T> {
    Validation::Success(value)
}

pub fn validation_failure<T>(issue: ConfigIssue) -> ConfigValidation<T> {
    Validation::Failure(NonEmptyVec::new(issue, Vec::new()))
}

/// Success with `value` when `issues` is empty.
fn from_issues<T>(value: T, issues: Vec<ConfigIssue>) -> ConfigValidation<T> {
    match NonEmptyVec::from_vec(issues) {
        Some(issues) => Validation::Failure(issues),
        None => Validation::Success(value),
    }
}

/// Move a validation's issues into `issues`, keeping the value on success.
fn collect<T>(issues: &mut Vec<ConfigIssue>, validation: ConfigValidation<T>) -> Option<T> {
    match validation {
        Validation::Success(value) => Some(value),
        Validation::Failure(errors) => {
            issues.extend(errors.into_iter());
            None
        }
    }
}

/// Convert to the crate error type, carrying every issue.
pub fn run_validation<T>(validation: ConfigValidation<T>) -> Result<T> {
    match validation {
        Validation::Success(value) => Ok(value),
        Validation::Failure(issues) => Err(Error::Configuration(issues.into_vec())),
    }
}

/// Validate a raw configuration, accumulating ALL issues.
pub fn validate_config(raw: &RawClusteringConfig) -> ConfigValidation<ClusteringRequest> {
    let mut issues = Vec::new();

    let algorithm = collect(&mut issues, validate_algorithm(raw.algorithm));
    let alphas = collect(&mut issues, validate_alphas(raw.alpha.as_ref()));
    let repeats = collect(&mut issues, validate_repeats(raw.repeats));
    let training = collect(&mut issues, validate_training(raw.training.as_ref()));
    let semantic = collect(&mut issues, validate_semantic(raw));
    let evaluation = collect(&mut issues, validate_evaluation(&raw.evaluation));
    let strategy = match algorithm {
        Some(algorithm) => collect(&mut issues, validate_strategy(algorithm, raw)),
        None => None,
    };

    match (algorithm, alphas, repeats, training, semantic, evaluation, strategy) {
        (
            Some(algorithm),
            Some(alphas),
            Some(repeats),
            Some(training),
            Some(semantic),
            Some((metrics, ground_truth)),
            Some(strategy),
        ) if issues.is_empty() => validation_success(ClusteringRequest {
            algorithm,
            alphas,
            epsilons: strategy.epsilons,
            min_samples: strategy.min_samples,
            n_clusters: strategy.n_clusters,
            discretizations: strategy.discretizations,
            repeats,
            seed: raw.seed.unwrap_or(DEFAULT_SEED),
            training,
            semantic,
            metrics,
            ground_truth,
        }),
        _ => from_issues(ClusteringRequest::new(Algorithm::Density), issues),
    }
}

/// Validate and convert in one step.
pub fn build_request(raw: &RawClusteringConfig) -> Result<ClusteringRequest> {
    run_validation(validate_config(raw))
}

fn validate_algorithm(algorithm: Option<Algorithm>) -> ConfigValidation<Algorithm> {
    match algorithm {
        Some(algorithm) => validation_success(algorithm),
        None => validation_failure(ConfigIssue::new(
            "algorithm",
            "is required (density, fuzzy or overlapping-gnn)",
        )),
    }
}

fn range_issues<T: PartialOrd + Default>(
    field: &str,
    values: &SweepValues<T>,
    issues: &mut Vec<ConfigIssue>,
) {
    if let SweepValues::Range(RangeSpec { start, end, step }) = values {
        if !(*step > T::default()) {
            issues.push(ConfigIssue::new(field, "range step must be positive"));
        }
        if !(start <= end) {
            issues.push(ConfigIssue::new(field, "range start must not exceed its end"));
        }
    }
    if let SweepValues::Many(list) = values {
        if list.is_empty() {
            issues.push(ConfigIssue::new(field, "list must not be empty"));
        }
    }
}

fn validate_alphas(alpha: Option<&SweepValues<f64>>) -> ConfigValidation<Vec<f64>> {
    let Some(alpha) = alpha else {
        return validation_success(vec![DEFAULT_ALPHA]);
    };
    let mut issues = Vec::new();
    range_issues("alpha", alpha, &mut issues);
    let values = alpha.expand();
    for value in &values {
        if !(0.0..=1.0).contains(value) {
            issues.push(ConfigIssue::new(
                "alpha",
                format!("{value} is outside [0, 1]"),
            ));
        }
    }
    from_issues(values, issues)
}

fn validate_repeats(repeats: Option<usize>) -> ConfigValidation<usize> {
    match repeats {
        Some(0) => validation_failure(ConfigIssue::new("repeats", "must be at least 1")),
        Some(n) => validation_success(n),
        None => validation_success(1),
    }
}

fn validate_training(training: Option<&TrainingConfig>) -> ConfigValidation<TrainingConfig> {
    let training = training.cloned().unwrap_or_default();
    let mut issues = Vec::new();
    if training.hidden_size == 0 {
        issues.push(ConfigIssue::new("training.hidden_size", "must be at least 1"));
    }
    if !(training.learning_rate > 0.0) {
        issues.push(ConfigIssue::new("training.learning_rate", "must be positive"));
    }
    if !(training.weight_decay >= 0.0) {
        issues.push(ConfigIssue::new("training.weight_decay", "must not be negative"));
    }
    if training.validation_interval == 0 {
        issues.push(ConfigIssue::new(
            "training.validation_interval",
            "must be at least 1",
        ));
    }
    from_issues(training, issues)
}

fn validate_semantic(raw: &RawClusteringConfig) -> ConfigValidation<SemanticSource> {
    let semantic = &raw.semantic;
    match (semantic.backend, &semantic.vectors) {
        (Some(BackendKind::Tfidf), Some(_)) => validation_failure(ConfigIssue::new(
            "semantic.vectors",
            "only used by the precomputed backend",
        )),
        (Some(BackendKind::Tfidf), None) | (None, None) => validation_success(SemanticSource::TfIdf),
        (_, Some(path)) => validation_success(SemanticSource::Precomputed(path.clone())),
        (Some(BackendKind::Precomputed), None) => validation_failure(ConfigIssue::new(
            "semantic.vectors",
            "is required by the precomputed backend",
        )),
    }
}

/// Metrics to compute and where the ground truth comes from.
pub type EvaluationPlan = (Vec<Metric>, Option<GroundTruthSource>);

/// Resolve metric names; defaults to the structural metrics, plus Precision
/// and the configured SR thresholds when a ground truth is given.
pub fn validate_evaluation(evaluation: &EvaluationConfig) -> ConfigValidation<EvaluationPlan> {
    let ground_truth = evaluation.ground_truth.clone().map(GroundTruthSource::detect);
    let mut issues = Vec::new();

    let sr_k = evaluation.sr_k.clone().unwrap_or_default();
    for k in &sr_k {
        if !(1..=10).contains(k) {
            issues.push(ConfigIssue::new(
                "evaluation.sr_k",
                format!("{k} is outside 1..=10"),
            ));
        }
    }

    let mut metrics = Vec::new();
    match &evaluation.metrics {
        None => {
            metrics.extend(Metric::STRUCTURAL);
            if ground_truth.is_some() {
                metrics.push(Metric::Precision);
                metrics.extend(sr_k.iter().map(|&k| Metric::SuccessRate(k)));
            }
        }
        Some(names) => {
            for name in names {
                if name.trim().eq_ignore_ascii_case("SR") {
                    if sr_k.is_empty() {
                        issues.push(ConfigIssue::new(
                            "evaluation.metrics",
                            "SR needs at least one k in evaluation.sr_k",
                        ));
                    }
                    metrics.extend(sr_k.iter().map(|&k| Metric::SuccessRate(k)));
                    continue;
                }
                match Metric::from_str(name) {
                    Ok(metric) => metrics.push(metric),
                    Err(Error::InvalidParameter { message, .. }) => {
                        issues.push(ConfigIssue::new("evaluation.metrics", message));
                    }
                    Err(other) => {
                        issues.push(ConfigIssue::new("evaluation.metrics", other.to_string()));
                    }
                }
            }
        }
    }

    if ground_truth.is_none() {
        if let Some(metric) = metrics.iter().find(|m| m.needs_ground_truth()) {
            issues.push(ConfigIssue::new(
                "evaluation.ground_truth",
                format!("{metric} requires a ground truth"),
            ));
        }
    }

    from_issues((metrics, ground_truth), issues)
}

/// Algorithm-specific parameters.
struct StrategyParams {
    epsilons: Vec<f64>,
    min_samples: usize,
    n_clusters: ClusterCounts,
    discretizations: Vec<Discretization>,
}

fn validate_strategy(algorithm: Algorithm, raw: &RawClusteringConfig) -> ConfigValidation<StrategyParams> {
    let mut issues = Vec::new();
    let mut params = StrategyParams {
        epsilons: Vec::new(),
        min_samples: 1,
        n_clusters: ClusterCounts::Auto,
        discretizations: Vec::new(),
    };

    if raw.hard == Some(true) && raw.threshold.is_some() {
        issues.push(ConfigIssue::new(
            "hard",
            "cannot be combined with a membership threshold",
        ));
    }

    match algorithm {
        Algorithm::Density => {
            match &raw.epsilon {
                Some(epsilon) => {
                    range_issues("epsilon", epsilon, &mut issues);
                    params.epsilons = epsilon.expand();
                    for value in &params.epsilons {
                        if !(*value > 0.0 && value.is_finite()) {
                            issues.push(ConfigIssue::new(
                                "epsilon",
                                format!("{value} must be a positive number"),
                            ));
                        }
                    }
                }
                None => issues.push(ConfigIssue::new("epsilon", "is required by density")),
            }
            match raw.min_samples {
                Some(0) => issues.push(ConfigIssue::new("min_samples", "must be at least 1")),
                Some(n) => params.min_samples = n,
                None => issues.push(ConfigIssue::new("min_samples", "is required by density")),
            }
        }
        Algorithm::Fuzzy | Algorithm::OverlappingGnn => {
            match &raw.n_clusters {
                Some(ClusterCountSpec::Counts(counts)) => {
                    range_issues("n_clusters", counts, &mut issues);
                    let counts = counts.expand();
                    if counts.contains(&0) {
                        issues.push(ConfigIssue::new("n_clusters", "counts must be at least 1"));
                    }
                    params.n_clusters = ClusterCounts::Fixed(counts);
                }
                Some(ClusterCountSpec::Keyword(word)) if word.eq_ignore_ascii_case("auto") => {
                    params.n_clusters = ClusterCounts::Auto;
                }
                Some(ClusterCountSpec::Keyword(word)) => issues.push(ConfigIssue::new(
                    "n_clusters",
                    format!("expected a count, list, range or \"auto\", found \"{word}\""),
                )),
                None => issues.push(ConfigIssue::new(
                    "n_clusters",
                    format!("is required by {algorithm}"),
                )),
            }
            match (&raw.threshold, raw.hard) {
                (Some(threshold), hard) if hard != Some(true) => {
                    range_issues("threshold", threshold, &mut issues);
                    let thresholds = threshold.expand();
                    for value in &thresholds {
                        if !(*value >= 0.0 && value.is_finite()) {
                            issues.push(ConfigIssue::new(
                                "threshold",
                                format!("{value} must be a non-negative number"),
                            ));
                        }
                    }
                    params.discretizations = thresholds
                        .into_iter()
                        .map(Discretization::Threshold)
                        .collect();
                }
                (None, Some(true)) => params.discretizations = vec![Discretization::Max],
                (Some(_), _) => {}
                (None, _) => issues.push(ConfigIssue::new(
                    "threshold",
                    format!("{algorithm} needs a threshold or hard = true"),
                )),
            }
        }
    }

    from_issues(params, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fuzzy() -> RawClusteringConfig {
        RawClusteringConfig {
            algorithm: Some(Algorithm::Fuzzy),
            n_clusters: Some(ClusterCountSpec::Counts(SweepValues::One(3))),
            threshold: Some(SweepValues::Many(vec![0.1, 0.2])),
            ..RawClusteringConfig::default()
        }
    }

    fn issue_fields(raw: &RawClusteringConfig) -> Vec<String> {
        match validate_config(raw) {
            Validation::Failure(issues) => issues.into_iter().map(|i| i.field).collect(),
            Validation::Success(_) => panic!("Expected validation failure"),
        }
    }

    #[test]
    fn test_valid_fuzzy_request() {
        let request = build_request(&fuzzy()).unwrap();
        assert_eq!(request.algorithm, Algorithm::Fuzzy);
        assert_eq!(request.alphas, vec![DEFAULT_ALPHA]);
        assert_eq!(request.n_clusters, ClusterCounts::Fixed(vec![3]));
        assert_eq!(
            request.discretizations,
            vec![Discretization::Threshold(0.1), Discretization::Threshold(0.2)]
        );
        assert_eq!(request.metrics, Metric::STRUCTURAL.to_vec());
        assert_eq!(request.seed, DEFAULT_SEED);
    }

    #[test]
    fn test_hard_and_threshold_conflict() {
        let raw = RawClusteringConfig {
            hard: Some(true),
            ..fuzzy()
        };
        assert_eq!(issue_fields(&raw), vec!["hard"]);
    }

    #[test]
    fn test_hard_alone_means_strongest_group() {
        let raw = RawClusteringConfig {
            hard: Some(true),
            threshold: None,
            ..fuzzy()
        };
        let request = build_request(&raw).unwrap();
        assert_eq!(request.discretizations, vec![Discretization::Max]);
    }

    #[test]
    fn test_all_issues_are_reported_together() {
        let raw = RawClusteringConfig {
            algorithm: Some(Algorithm::OverlappingGnn),
            alpha: Some(SweepValues::Many(vec![0.5, 1.5])),
            repeats: Some(0),
            evaluation: EvaluationConfig {
                metrics: Some(vec!["SM".into(), "Precision".into(), "SR".into()]),
                ..EvaluationConfig::default()
            },
            ..RawClusteringConfig::default()
        };
        let fields = issue_fields(&raw);
        for expected in [
            "alpha",
            "repeats",
            "evaluation.metrics",
            "evaluation.ground_truth",
            "n_clusters",
            "threshold",
        ] {
            assert!(
                fields.iter().any(|f| f == expected),
                "missing {expected} in {fields:?}"
            );
        }
    }

    #[test]
    fn test_density_requires_its_parameters() {
        let raw = RawClusteringConfig {
            algorithm: Some(Algorithm::Density),
            ..RawClusteringConfig::default()
        };
        assert_eq!(issue_fields(&raw), vec!["epsilon", "min_samples"]);

        let raw = RawClusteringConfig {
            algorithm: Some(Algorithm::Density),
            epsilon: Some(SweepValues::Many(vec![0.0, 0.2])),
            min_samples: Some(0),
            ..RawClusteringConfig::default()
        };
        assert_eq!(issue_fields(&raw), vec!["epsilon", "min_samples"]);
    }

    #[test]
    fn test_bad_ranges_rejected() {
        let raw = RawClusteringConfig {
            alpha: Some(SweepValues::Range(RangeSpec {
                start: 0.8,
                end: 0.2,
                step: 0.0,
            })),
            ..fuzzy()
        };
        let fields = issue_fields(&raw);
        assert_eq!(fields, vec!["alpha", "alpha"]);
    }

    #[test]
    fn test_sr_thresholds_expand_and_are_bounded() {
        let raw = RawClusteringConfig {
            evaluation: EvaluationConfig {
                metrics: Some(vec!["SM".into(), "SR".into()]),
                sr_k: Some(vec![7, 10]),
                ground_truth: Some("truth.json".into()),
            },
            ..fuzzy()
        };
        let request = build_request(&raw).unwrap();
        assert_eq!(
            request.metrics,
            vec![
                Metric::StructuralModularity,
                Metric::SuccessRate(7),
                Metric::SuccessRate(10)
            ]
        );
        assert_eq!(
            request.ground_truth,
            Some(GroundTruthSource::Mapping("truth.json".into()))
        );

        let raw = RawClusteringConfig {
            evaluation: EvaluationConfig {
                metrics: Some(vec!["SR@11".into()]),
                sr_k: Some(vec![0]),
                ground_truth: Some("truth.json".into()),
            },
            ..fuzzy()
        };
        assert_eq!(
            issue_fields(&raw),
            vec!["evaluation.sr_k", "evaluation.metrics"]
        );
    }

    #[test]
    fn test_missing_algorithm_reported() {
        assert_eq!(
            issue_fields(&RawClusteringConfig::default()),
            vec!["algorithm"]
        );
    }

    #[test]
    fn test_run_validation_carries_every_issue() {
        let raw = RawClusteringConfig {
            repeats: Some(0),
            ..RawClusteringConfig::default()
        };
        match build_request(&raw) {
            Err(Error::Configuration(issues)) => assert_eq!(issues.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
