use super::{load_graph, load_ground_truth};
use crate::config::{run_validation, validate_evaluation, EvaluationConfig};
use crate::evaluation::EvaluationSuite;
use crate::report::{output_json, ThresholdSweepResult};
use anyhow::{Context, Result};
use std::path::PathBuf;

pub struct RescoreConfig {
    pub classes: PathBuf,
    pub report: PathBuf,
    pub ground_truth: Option<PathBuf>,
    pub metrics: Option<Vec<String>>,
    pub sr_k: Option<Vec<u32>>,
    pub output: Option<PathBuf>,
}

/// Recompute the metrics of every record; groupings are left untouched and
/// previous scores are replaced.
pub fn run_rescore(config: RescoreConfig) -> Result<ThresholdSweepResult> {
    let graph = load_graph(&config.classes)?;
    let mut result = ThresholdSweepResult::from_path(&config.report)?;

    let evaluation = EvaluationConfig {
        metrics: config.metrics,
        sr_k: config.sr_k,
        ground_truth: config.ground_truth,
    };
    let (metrics, source) = run_validation(validate_evaluation(&evaluation))?;
    let truth = source
        .as_ref()
        .map(|source| load_ground_truth(source, &graph))
        .transpose()?;
    let suite = EvaluationSuite::new(&graph, metrics, truth)?;

    for (index, record) in result.records_mut().iter_mut().enumerate() {
        record.metrics = suite
            .evaluate(&record.microservices)
            .with_context(|| format!("Failed to rescore record {index}"))?;
    }
    tracing::info!(records = result.len(), "report rescored");

    let output = config.output.unwrap_or(config.report);
    output_json(&result, Some(output))?;
    Ok(result)
}
