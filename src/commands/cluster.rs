use super::{load_graph, load_ground_truth};
use crate::cli::ClusterOverrides;
use crate::config::{build_request, load_config};
use crate::evaluation::EvaluationSuite;
use crate::progress::{ProgressConfig, TEMPLATE_SWEEP};
use crate::report::{output_json, ThresholdSweepResult};
use crate::sweep::SweepRunner;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub struct ClusterConfig {
    pub classes: PathBuf,
    pub config: Option<PathBuf>,
    pub overrides: ClusterOverrides,
    pub output: Option<PathBuf>,
    pub summary: bool,
    pub progress: ProgressConfig,
}

/// Validate the request, run the sweep and write the report.
pub fn run_cluster(config: ClusterConfig) -> Result<ThresholdSweepResult> {
    let raw = load_config(config.config.as_deref())?.merge(config.overrides.to_raw());
    let request = build_request(&raw)?;

    let graph = load_graph(&config.classes)?;
    let ground_truth = request
        .ground_truth
        .as_ref()
        .map(|source| load_ground_truth(source, &graph))
        .transpose()?;
    let suite = EvaluationSuite::new(&graph, request.metrics.iter().copied(), ground_truth)?;
    let semantic = request
        .semantic
        .load()
        .context("Failed to prepare the semantic backend")?;

    let runner = SweepRunner::new(&graph, &request, &suite, semantic);
    let bar = config
        .progress
        .create_bar(runner.units().len() as u64, TEMPLATE_SWEEP);
    bar.set_message(request.algorithm.name());
    let result = runner.run(Some(&bar))?;
    bar.finish_and_clear();

    output_json(&result, config.output)?;
    if config.summary {
        eprintln!("{}", result.summary_table());
    }
    Ok(result)
}
