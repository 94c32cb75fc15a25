//! Command implementations for the servicecut binary.
//!
//! - **cluster**: run a clustering sweep and score every point
//! - **evaluate**: score a ground-truth decomposition
//! - **rescore**: recompute metrics for an existing report
//! - **init**: write a default `servicecut.toml`

pub mod cluster;
pub mod evaluate;
pub mod init;
pub mod rescore;

pub use cluster::{run_cluster, ClusterConfig};
pub use evaluate::{run_evaluate, EvaluateConfig, EvaluationReport};
pub use init::init_config;
pub use rescore::{run_rescore, RescoreConfig};

use crate::graph::{ClassGraph, GroundTruthSource, ParsedClasses};
use crate::membership::MembershipStructure;
use anyhow::{Context, Result};
use std::path::Path;

/// Read parser output and build the class graph.
pub fn load_graph(path: &Path) -> Result<ClassGraph> {
    let _span = tracing::info_span!("load_graph", path = %path.display()).entered();
    let parsed = ParsedClasses::from_path(path)
        .with_context(|| format!("Failed to read classes from {}", path.display()))?;
    let graph = ClassGraph::from_parsed(parsed)
        .with_context(|| format!("Invalid class graph in {}", path.display()))?;
    tracing::info!(
        classes = graph.len(),
        unresolved_calls = graph.unresolved_count(),
        "class graph loaded"
    );
    Ok(graph)
}

/// Load a ground truth and map it onto the graph's class order.
pub fn load_ground_truth(
    source: &GroundTruthSource,
    graph: &ClassGraph,
) -> Result<MembershipStructure> {
    let truth = source.load()?;
    if truth.is_empty() {
        tracing::warn!(path = %source.path().display(), "ground truth is empty");
    }
    Ok(truth.to_membership(graph))
}
