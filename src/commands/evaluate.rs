use super::{load_graph, load_ground_truth};
use crate::config::{run_validation, validate_evaluation, EvaluationConfig};
use crate::evaluation::{EvaluationSuite, Metric, MetricScores};
use crate::graph::GroundTruthSource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub struct EvaluateConfig {
    pub classes: PathBuf,
    pub ground_truth: PathBuf,
    pub metrics: Option<Vec<String>>,
    pub output: Option<PathBuf>,
}

/// Scores of a ground-truth decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub classes: usize,
    pub groups: usize,
    pub unassigned: usize,
    #[serde(flatten)]
    pub metrics: MetricScores,
}

pub fn run_evaluate(config: EvaluateConfig) -> Result<EvaluationReport> {
    let graph = load_graph(&config.classes)?;
    let source = GroundTruthSource::detect(&config.ground_truth);
    let truth = load_ground_truth(&source, &graph)?;

    // Precision/SR of a ground truth against itself carry no information.
    let metrics = match config.metrics {
        Some(names) => {
            let evaluation = EvaluationConfig {
                metrics: Some(names),
                sr_k: None,
                ground_truth: Some(config.ground_truth.clone()),
            };
            run_validation(validate_evaluation(&evaluation))?.0
        }
        None => Metric::STRUCTURAL.to_vec(),
    };

    let suite = EvaluationSuite::new(&graph, metrics, Some(truth.clone()))?;
    let report = EvaluationReport {
        classes: graph.len(),
        groups: truth.group_count(),
        unassigned: truth.unassigned_count(),
        metrics: suite.evaluate(&truth)?,
    };

    let json = serde_json::to_string_pretty(&report)?;
    match &config.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(report)
}
