//! Sweep results: one flat record per sweep point, serialised in order.

use crate::clustering::{Discretization, TrainingReport};
use crate::evaluation::MetricScores;
use crate::membership::MembershipStructure;
use crate::sweep::Algorithm;
use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One clustering run and its scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub algorithm: Algorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_clusters: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Discretization>,
    pub microservices: MembershipStructure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingReport>,
    #[serde(flatten)]
    pub metrics: MetricScores,
}

impl SweepRecord {
    pub fn group_count(&self) -> usize {
        self.microservices.group_count()
    }

    /// Short `alpha=.. eps=..` label of the hyperparameters.
    pub fn parameters(&self) -> String {
        let mut parts = Vec::new();
        if let Some(alpha) = self.alpha {
            parts.push(format!("alpha={alpha}"));
        }
        if let Some(epsilon) = self.epsilon {
            parts.push(format!("eps={epsilon}"));
        }
        if let Some(n) = self.n_clusters {
            parts.push(format!("k={n}"));
        }
        if let Some(threshold) = self.threshold {
            parts.push(format!("threshold={threshold}"));
        }
        parts.join(" ")
    }
}

/// Every record of a sweep, in sweep order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdSweepResult {
    records: Vec<SweepRecord>,
}

impl ThresholdSweepResult {
    pub fn new(records: Vec<SweepRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[SweepRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [SweepRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse report {}", path.display()))
    }

    /// Metric names in first-seen order.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for record in &self.records {
            for (name, _) in record.metrics.iter() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Summary table: one row per record with its groups and scores.
    pub fn summary_table(&self) -> Table {
        let metrics = self.metric_names();
        let mut header = vec![
            "algorithm".to_string(),
            "parameters".to_string(),
            "groups".to_string(),
            "unassigned".to_string(),
        ];
        header.extend(metrics.iter().cloned());

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header);
        for record in &self.records {
            let mut row = vec![
                record.algorithm.to_string(),
                record.parameters(),
                record.group_count().to_string(),
                record.microservices.unassigned_count().to_string(),
            ];
            row.extend(metrics.iter().map(|name| {
                record
                    .metrics
                    .get(name)
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
            }));
            table.add_row(row);
        }
        table
    }
}

/// Write the report as pretty JSON to `output_file`, or stdout.
pub fn output_json(result: &ThresholdSweepResult, output_file: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    if let Some(path) = output_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(json.as_bytes())?;
    } else {
        println!("{json}");
    }
    Ok(())
}
