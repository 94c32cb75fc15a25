//! Running a clustering strategy across hyperparameter sweeps.
//!
//! A sweep is split into independent units of work. A density unit is one
//! mixing weight, whose distance matrix is reused by every epsilon layer. A
//! fuzzy unit is one (mixing weight, group count) pair and an overlapping unit
//! one group count; their affinities are computed once and discretised at
//! every threshold. Units run in parallel and share the structural and
//! semantic matrices, each computed at most once and only when some unit
//! needs it.

use crate::clustering::overlapping::TrainingConfig;
use crate::clustering::{
    discretize, ClusteringInput, Dbscan, Discretization, FuzzyCMeans, OverlappingGnn,
    SoftClustering, TrainingReport,
};
use crate::errors::Result;
use crate::evaluation::{EvaluationSuite, Metric};
use crate::graph::{ClassGraph, GroundTruthSource};
use crate::membership::MembershipStructure;
use crate::report::{SweepRecord, ThresholdSweepResult};
use crate::similarity::{
    call_adjacency, cosine_similarity, fuse_with, structural_similarity, SemanticSimilarity,
    SemanticSource, SimilarityMatrix,
};
use indicatif::{ParallelProgressIterator, ProgressBar};
use ndarray::Array2;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    Density,
    Fuzzy,
    OverlappingGnn,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Density => "density",
            Algorithm::Fuzzy => "fuzzy",
            Algorithm::OverlappingGnn => "overlapping-gnn",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Group counts to sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCounts {
    Fixed(Vec<usize>),
    /// Even counts from 2 up to `N / 2 + 1`.
    Auto,
}

impl ClusterCounts {
    pub fn resolve(&self, n_classes: usize) -> Vec<usize> {
        match self {
            ClusterCounts::Fixed(counts) => counts.clone(),
            ClusterCounts::Auto => (2..=n_classes / 2 + 1).step_by(2).collect(),
        }
    }
}

/// A validated clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringRequest {
    pub algorithm: Algorithm,
    /// Structural weights; unused by the overlapping strategy.
    pub alphas: Vec<f64>,
    pub epsilons: Vec<f64>,
    pub min_samples: usize,
    pub n_clusters: ClusterCounts,
    pub discretizations: Vec<Discretization>,
    /// Fuzzy runs averaged per unit, seeded `seed, seed + 1, ...`.
    pub repeats: usize,
    pub seed: u64,
    pub training: TrainingConfig,
    pub semantic: SemanticSource,
    pub metrics: Vec<Metric>,
    pub ground_truth: Option<GroundTruthSource>,
}

impl ClusteringRequest {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            alphas: vec![0.5],
            epsilons: Vec::new(),
            min_samples: 1,
            n_clusters: ClusterCounts::Auto,
            discretizations: vec![Discretization::Max],
            repeats: 1,
            seed: 42,
            training: TrainingConfig::default(),
            semantic: SemanticSource::default(),
            metrics: Metric::STRUCTURAL.to_vec(),
            ground_truth: None,
        }
    }
}

/// An independent piece of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepUnit {
    Density { alpha: f64 },
    Fuzzy { alpha: f64, n_clusters: usize },
    OverlappingGnn { n_clusters: usize },
}

/// Hyperparameters of one record.
#[derive(Debug, Clone, Copy, Default)]
struct Point {
    alpha: Option<f64>,
    epsilon: Option<f64>,
    n_clusters: Option<usize>,
    threshold: Option<Discretization>,
}

pub struct SweepRunner<'a> {
    graph: &'a ClassGraph,
    request: &'a ClusteringRequest,
    suite: &'a EvaluationSuite<'a>,
    semantic: SemanticSimilarity,
    structural_matrix: OnceCell<SimilarityMatrix>,
    semantic_features: OnceCell<Array2<f64>>,
    semantic_matrix: OnceCell<SimilarityMatrix>,
    adjacency: OnceCell<Array2<f64>>,
}

impl<'a> SweepRunner<'a> {
    pub fn new(
        graph: &'a ClassGraph,
        request: &'a ClusteringRequest,
        suite: &'a EvaluationSuite<'a>,
        semantic: SemanticSimilarity,
    ) -> Self {
        Self {
            graph,
            request,
            suite,
            semantic,
            structural_matrix: OnceCell::new(),
            semantic_features: OnceCell::new(),
            semantic_matrix: OnceCell::new(),
            adjacency: OnceCell::new(),
        }
    }

    /// Units in record order.
    pub fn units(&self) -> Vec<SweepUnit> {
        let request = self.request;
        let counts = request.n_clusters.resolve(self.graph.len());
        match request.algorithm {
            Algorithm::Density => request
                .alphas
                .iter()
                .map(|&alpha| SweepUnit::Density { alpha })
                .collect(),
            Algorithm::Fuzzy => request
                .alphas
                .iter()
                .flat_map(|&alpha| {
                    counts
                        .iter()
                        .map(move |&n_clusters| SweepUnit::Fuzzy { alpha, n_clusters })
                })
                .collect(),
            Algorithm::OverlappingGnn => counts
                .into_iter()
                .map(|n_clusters| SweepUnit::OverlappingGnn { n_clusters })
                .collect(),
        }
    }

    /// Run every unit in parallel; records keep unit order.
    pub fn run(&self, progress: Option<&ProgressBar>) -> Result<ThresholdSweepResult> {
        let units = self.units();
        let _span = tracing::info_span!(
            "sweep",
            algorithm = self.request.algorithm.name(),
            units = units.len()
        )
        .entered();
        if units.is_empty() {
            tracing::warn!("sweep has no points");
        }
        let bar = progress.cloned().unwrap_or_else(ProgressBar::hidden);
        bar.set_length(units.len() as u64);

        let batches: Vec<Vec<SweepRecord>> = units
            .par_iter()
            .progress_with(bar)
            .map(|unit| self.run_unit(unit))
            .collect::<Result<_>>()?;
        Ok(ThresholdSweepResult::new(
            batches.into_iter().flatten().collect(),
        ))
    }

    pub fn run_unit(&self, unit: &SweepUnit) -> Result<Vec<SweepRecord>> {
        let request = self.request;
        match *unit {
            SweepUnit::Density { alpha } => {
                let distance = self.similarity(alpha)?.to_distance();
                let Some(&first) = request.epsilons.first() else {
                    return Ok(Vec::new());
                };
                let layers = Dbscan::new(first, request.min_samples)
                    .layers(&distance, &request.epsilons)?;
                request
                    .epsilons
                    .iter()
                    .zip(layers)
                    .map(|(&epsilon, membership)| {
                        let point = Point {
                            alpha: Some(alpha),
                            epsilon: Some(epsilon),
                            ..Point::default()
                        };
                        self.record(point, membership, None)
                    })
                    .collect()
            }
            SweepUnit::Fuzzy { alpha, n_clusters } => {
                let distance = self.similarity(alpha)?.to_distance();
                let fcm = FuzzyCMeans::new(n_clusters, Discretization::Max)
                    .with_repeats(request.repeats)
                    .with_seed(request.seed);
                let affinities = fcm.affinities(&ClusteringInput::Distance(&distance))?;
                let point = Point {
                    alpha: Some(alpha),
                    n_clusters: Some(n_clusters),
                    ..Point::default()
                };
                self.threshold_layers(point, &affinities, None)
            }
            SweepUnit::OverlappingGnn { n_clusters } => {
                let adjacency = self
                    .adjacency
                    .get_or_init(|| call_adjacency(self.graph));
                let features = self.semantic_features()?;
                let gnn = OverlappingGnn::new(n_clusters, Discretization::Max)
                    .with_training(request.training.clone());
                let (affinities, training) = gnn.fit(&ClusteringInput::Graph {
                    adjacency,
                    features,
                })?;
                let point = Point {
                    n_clusters: Some(n_clusters),
                    ..Point::default()
                };
                self.threshold_layers(point, &affinities, Some(training))
            }
        }
    }

    fn threshold_layers(
        &self,
        point: Point,
        affinities: &Array2<f64>,
        training: Option<TrainingReport>,
    ) -> Result<Vec<SweepRecord>> {
        self.request
            .discretizations
            .iter()
            .map(|&policy| {
                let point = Point {
                    threshold: Some(policy),
                    ..point
                };
                self.record(point, discretize(affinities, policy), training.clone())
            })
            .collect()
    }

    fn record(
        &self,
        point: Point,
        membership: MembershipStructure,
        training: Option<TrainingReport>,
    ) -> Result<SweepRecord> {
        let metrics = self.suite.evaluate(&membership)?;
        tracing::debug!(
            alpha = point.alpha,
            epsilon = point.epsilon,
            n_clusters = point.n_clusters,
            groups = membership.group_count(),
            unassigned = membership.unassigned_count(),
            "sweep point"
        );
        Ok(SweepRecord {
            algorithm: self.request.algorithm,
            alpha: point.alpha,
            epsilon: point.epsilon,
            n_clusters: point.n_clusters,
            threshold: point.threshold,
            microservices: membership,
            training,
            metrics,
        })
    }

    fn semantic_features(&self) -> Result<&Array2<f64>> {
        self.semantic_features.get_or_try_init(|| {
            let _span = tracing::info_span!(
                "semantic_features",
                backend = self.semantic.backend_name()
            )
            .entered();
            self.semantic.features(self.graph)
        })
    }

    /// Fused similarity; each side is computed on first use only.
    fn similarity(&self, alpha: f64) -> Result<SimilarityMatrix> {
        fuse_with(
            alpha,
            || {
                Ok(self
                    .structural_matrix
                    .get_or_init(|| structural_similarity(self.graph))
                    .clone())
            },
            || {
                self.semantic_matrix
                    .get_or_try_init(|| self.semantic_features().map(cosine_similarity))
                    .cloned()
            },
        )
    }

    /// Whether the semantic backend has been used so far.
    pub fn semantic_computed(&self) -> bool {
        self.semantic_features.get().is_some()
    }

    /// Whether structural similarity has been computed so far.
    pub fn structural_computed(&self) -> bool {
        self.structural_matrix.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ClassRecord;
    use crate::similarity::EmbeddingBackend;

    fn graph() -> ClassGraph {
        ClassGraph::from_records(vec![
            ClassRecord::new("A")
                .with_methods(["a"])
                .with_calls(["b", "b"])
                .with_words(["order", "item"]),
            ClassRecord::new("B").with_methods(["b"]).with_words(["order"]),
            ClassRecord::new("C")
                .with_methods(["c"])
                .with_calls(["d", "d"])
                .with_words(["customer", "account"]),
            ClassRecord::new("D")
                .with_methods(["d"])
                .with_words(["account"]),
        ])
        .unwrap()
    }

    struct FailingBackend;

    impl EmbeddingBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn embed(&self, _graph: &ClassGraph) -> Result<Array2<f64>> {
            panic!("semantic backend must not run at alpha = 1");
        }
    }

    #[test]
    fn test_auto_cluster_counts() {
        assert_eq!(ClusterCounts::Auto.resolve(4), vec![2]);
        assert_eq!(ClusterCounts::Auto.resolve(10), vec![2, 4, 6]);
        assert!(ClusterCounts::Auto.resolve(1).is_empty());
    }

    #[test]
    fn test_density_sweep_skips_semantic_at_alpha_one() {
        let graph = graph();
        let request = ClusteringRequest {
            alphas: vec![1.0],
            epsilons: vec![0.5, 1.0],
            ..ClusteringRequest::new(Algorithm::Density)
        };
        let suite = EvaluationSuite::new(&graph, request.metrics.clone(), None).unwrap();
        let runner = SweepRunner::new(
            &graph,
            &request,
            &suite,
            SemanticSimilarity::new(Box::new(FailingBackend)),
        );
        let result = runner.run(None).unwrap();

        assert!(runner.structural_computed());
        assert!(!runner.semantic_computed());
        assert_eq!(result.len(), 2);
        let first = &result.records()[0];
        assert_eq!(first.epsilon, Some(0.5));
        assert_eq!(first.microservices.group_count(), 2);
        assert!(first.metrics.get("SM").unwrap() > 0.0);
        // eps = 1 links everything.
        assert_eq!(result.records()[1].microservices.group_count(), 1);
    }

    #[test]
    fn test_fuzzy_records_follow_unit_order() {
        let graph = graph();
        let request = ClusteringRequest {
            alphas: vec![0.0, 1.0],
            n_clusters: ClusterCounts::Fixed(vec![2]),
            discretizations: vec![Discretization::Threshold(0.2), Discretization::Max],
            ..ClusteringRequest::new(Algorithm::Fuzzy)
        };
        let suite = EvaluationSuite::new(&graph, request.metrics.clone(), None).unwrap();
        let runner = SweepRunner::new(&graph, &request, &suite, SemanticSimilarity::default());
        let result = runner.run(None).unwrap();

        let points: Vec<(Option<f64>, Option<Discretization>)> = result
            .records()
            .iter()
            .map(|r| (r.alpha, r.threshold))
            .collect();
        assert_eq!(
            points,
            vec![
                (Some(0.0), Some(Discretization::Threshold(0.2))),
                (Some(0.0), Some(Discretization::Max)),
                (Some(1.0), Some(Discretization::Threshold(0.2))),
                (Some(1.0), Some(Discretization::Max)),
            ]
        );
        assert!(result.records().iter().all(|r| r.n_clusters == Some(2)));
    }

    #[test]
    fn test_too_many_groups_is_an_error() {
        let graph = graph();
        let request = ClusteringRequest {
            alphas: vec![1.0],
            n_clusters: ClusterCounts::Fixed(vec![5]),
            ..ClusteringRequest::new(Algorithm::Fuzzy)
        };
        let suite = EvaluationSuite::new(&graph, request.metrics.clone(), None).unwrap();
        let runner = SweepRunner::new(&graph, &request, &suite, SemanticSimilarity::default());
        assert!(runner.run(None).is_err());
    }
}
