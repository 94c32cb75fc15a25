//! Parser output to scored groupings through the library API.

use pretty_assertions::assert_eq;
use servicecut::clustering::Discretization;
use servicecut::graph::ParsedClasses;
use servicecut::{
    Algorithm, ClassGraph, ClusterCounts, ClusteringRequest, EvaluationSuite, GroundTruthSource,
    Metric, SemanticSimilarity, SweepRunner,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn shop_graph() -> ClassGraph {
    let parsed = ParsedClasses::from_path(&fixture("shop_classes.json")).unwrap();
    ClassGraph::from_parsed(parsed).unwrap()
}

#[test]
fn test_library_calls_are_not_resolved() {
    let graph = shop_graph();
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.name(0), "Cart");
    assert_eq!(graph.call_matrix().calls(0, 1), 2);
    assert_eq!(graph.call_matrix().calls(2, 3), 2);
    assert_eq!(graph.unresolved_count(), 1);
}

#[test]
fn test_density_recovers_the_two_services() {
    let graph = shop_graph();
    let truth = GroundTruthSource::detect(fixture("shop_truth.json"))
        .load()
        .unwrap()
        .to_membership(&graph);

    let mut metrics = Metric::STRUCTURAL.to_vec();
    metrics.extend([Metric::Precision, Metric::SuccessRate(10)]);
    let request = ClusteringRequest {
        alphas: vec![1.0],
        epsilons: vec![0.5],
        min_samples: 1,
        metrics: metrics.clone(),
        ..ClusteringRequest::new(Algorithm::Density)
    };
    let suite = EvaluationSuite::new(&graph, metrics, Some(truth)).unwrap();
    let runner = SweepRunner::new(&graph, &request, &suite, SemanticSimilarity::default());
    let result = runner.run(None).unwrap();

    assert_eq!(result.len(), 1);
    let record = &result.records()[0];
    let groups: Vec<Vec<&str>> = record
        .microservices
        .groups()
        .into_iter()
        .map(|group| group.into_iter().map(|class| graph.name(class)).collect())
        .collect();
    assert_eq!(groups, vec![vec!["Cart", "Item"], vec!["Account", "Hasher"]]);

    let score = |key: &str| record.metrics.get(key).unwrap();
    assert!((score("SM") - 0.5).abs() < 1e-12);
    assert_eq!(score("ICP"), 0.0);
    assert_eq!(score("IFN"), 0.0);
    assert_eq!(score("NED"), 1.0);
    assert_eq!(score("Precision"), 1.0);
    assert_eq!(score("SR@10"), 1.0);
}

#[test]
fn test_higher_thresholds_never_add_memberships() {
    let graph = shop_graph();
    let thresholds: Vec<Discretization> = (0..10)
        .map(|step| Discretization::Threshold(f64::from(step) / 10.0))
        .collect();
    let request = ClusteringRequest {
        alphas: vec![0.5],
        n_clusters: ClusterCounts::Fixed(vec![2]),
        discretizations: thresholds,
        ..ClusteringRequest::new(Algorithm::Fuzzy)
    };
    let suite = EvaluationSuite::new(&graph, request.metrics.clone(), None).unwrap();
    let runner = SweepRunner::new(&graph, &request, &suite, SemanticSimilarity::default());
    let result = runner.run(None).unwrap();

    let counts: Vec<usize> = result
        .records()
        .iter()
        .map(|record| record.microservices.membership_count())
        .collect();
    assert_eq!(counts.len(), 10);
    // Threshold 0 admits every class to every group.
    assert_eq!(counts[0], 2 * graph.len());
    assert!(
        counts.windows(2).all(|pair| pair[1] <= pair[0]),
        "membership counts grew: {counts:?}"
    );
}

#[test]
fn test_report_round_trips_through_rescoring_inputs() {
    let graph = shop_graph();
    let request = ClusteringRequest {
        alphas: vec![1.0],
        epsilons: vec![0.5, 1.0],
        ..ClusteringRequest::new(Algorithm::Density)
    };
    let suite = EvaluationSuite::new(&graph, request.metrics.clone(), None).unwrap();
    let runner = SweepRunner::new(&graph, &request, &suite, SemanticSimilarity::default());
    let result = runner.run(None).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let back: servicecut::ThresholdSweepResult = serde_json::from_str(&json).unwrap();
    for (before, after) in result.records().iter().zip(back.records()) {
        assert_eq!(
            suite.evaluate(&after.microservices).unwrap(),
            before.metrics
        );
    }
}
