//! Quality metrics for a membership structure.
//!
//! Structural metrics read the resolved call graph; `Precision` and `SR@k`
//! compare against a ground-truth decomposition. Every metric is total: empty
//! groups, missing calls and unassigned classes produce neutral values, never
//! errors. The only failures are caller preconditions, checked when an
//! [`EvaluationSuite`] is built or a candidate of the wrong length is passed.

pub mod distribution;
pub mod ground_truth;
pub mod structural;

use crate::errors::{Error, Result};
use crate::graph::ClassGraph;
use crate::membership::MembershipStructure;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

pub use distribution::non_extreme_distribution;
pub use ground_truth::{corresponding_group, precision, success_rate};
pub use structural::{inter_call_percentage, interface_number, structural_modularity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    StructuralModularity,
    InterCallPercentage,
    InterfaceNumber,
    NonExtremeDistribution,
    Precision,
    /// Success rate with threshold `k / 10`, `k` in `1..=10`.
    SuccessRate(u32),
}

impl Metric {
    /// Metrics that need only the call graph.
    pub const STRUCTURAL: [Metric; 4] = [
        Metric::StructuralModularity,
        Metric::InterCallPercentage,
        Metric::InterfaceNumber,
        Metric::NonExtremeDistribution,
    ];

    pub fn needs_ground_truth(&self) -> bool {
        matches!(self, Metric::Precision | Metric::SuccessRate(_))
    }

    /// Report key, e.g. `SM` or `SR@7`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::StructuralModularity => write!(f, "SM"),
            Metric::InterCallPercentage => write!(f, "ICP"),
            Metric::InterfaceNumber => write!(f, "IFN"),
            Metric::NonExtremeDistribution => write!(f, "NED"),
            Metric::Precision => write!(f, "Precision"),
            Metric::SuccessRate(k) => write!(f, "SR@{k}"),
        }
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        match name.to_ascii_uppercase().as_str() {
            "SM" => return Ok(Metric::StructuralModularity),
            "ICP" => return Ok(Metric::InterCallPercentage),
            "IFN" => return Ok(Metric::InterfaceNumber),
            "NED" => return Ok(Metric::NonExtremeDistribution),
            "PRECISION" => return Ok(Metric::Precision),
            _ => {}
        }
        let k = name
            .strip_prefix("SR@")
            .or_else(|| name.strip_prefix("sr@"))
            .ok_or_else(|| {
                Error::invalid_parameter("metrics", format!("unknown metric '{name}'"))
            })?;
        let k: u32 = k.parse().map_err(|_| {
            Error::invalid_parameter("metrics", format!("bad SR threshold in '{name}'"))
        })?;
        if !(1..=10).contains(&k) {
            return Err(Error::invalid_parameter(
                "metrics",
                format!("SR threshold {k} outside 1..=10"),
            ));
        }
        Ok(Metric::SuccessRate(k))
    }
}

/// Metric values keyed by report name, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricScores {
    entries: Vec<(String, f64)>,
}

impl MetricScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetricScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetricScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = MetricScores;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metric names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut scores = MetricScores::new();
                while let Some((key, value)) = access.next_entry::<String, f64>()? {
                    scores.insert(key, value);
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

/// A fixed set of metrics bound to one class graph and optional ground truth.
#[derive(Debug, Clone)]
pub struct EvaluationSuite<'a> {
    graph: &'a ClassGraph,
    metrics: Vec<Metric>,
    ground_truth: Option<MembershipStructure>,
}

impl<'a> EvaluationSuite<'a> {
    /// Duplicate metrics are dropped and sparse ground-truth ids are
    /// renumbered. Fails when a metric needs ground truth
    /// and none is given, or when the ground truth does not cover the graph.
    pub fn new(
        graph: &'a ClassGraph,
        metrics: impl IntoIterator<Item = Metric>,
        ground_truth: Option<MembershipStructure>,
    ) -> Result<Self> {
        let mut unique: Vec<Metric> = Vec::new();
        for metric in metrics {
            if !unique.contains(&metric) {
                unique.push(metric);
            }
        }
        if ground_truth.is_none() {
            if let Some(metric) = unique.iter().find(|m| m.needs_ground_truth()) {
                return Err(Error::MissingGroundTruth {
                    metric: metric.key(),
                });
            }
        }
        if let Some(truth) = &ground_truth {
            if truth.len() != graph.len() {
                return Err(Error::DimensionMismatch {
                    expected: graph.len(),
                    found: truth.len(),
                });
            }
        }
        Ok(Self {
            graph,
            metrics: unique,
            ground_truth: ground_truth.map(|truth| {
                if truth.is_dense() {
                    truth
                } else {
                    truth.compacted()
                }
            }),
        })
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn ground_truth(&self) -> Option<&MembershipStructure> {
        self.ground_truth.as_ref()
    }

    /// Score `candidate`. Groupings read from outside may carry sparse ids
    /// (`[[0], [7]]`); they are scored as their dense renumbering, so `K` is
    /// the number of groups actually present.
    pub fn evaluate(&self, candidate: &MembershipStructure) -> Result<MetricScores> {
        if candidate.len() != self.graph.len() {
            return Err(Error::DimensionMismatch {
                expected: self.graph.len(),
                found: candidate.len(),
            });
        }
        let candidate = dense_ids(candidate);
        let mut scores = MetricScores::new();
        for metric in &self.metrics {
            scores.insert(metric.key(), self.score(*metric, &candidate));
        }
        Ok(scores)
    }

    fn score(&self, metric: Metric, candidate: &MembershipStructure) -> f64 {
        let truth = self.ground_truth.as_ref();
        match metric {
            Metric::StructuralModularity => structural_modularity(candidate, self.graph),
            Metric::InterCallPercentage => inter_call_percentage(candidate, self.graph),
            Metric::InterfaceNumber => interface_number(candidate, self.graph),
            Metric::NonExtremeDistribution => non_extreme_distribution(candidate),
            Metric::Precision => truth.map_or(0.0, |t| precision(candidate, t)),
            Metric::SuccessRate(k) => truth.map_or(0.0, |t| success_rate(candidate, t, k)),
        }
    }
}

fn dense_ids(structure: &MembershipStructure) -> Cow<'_, MembershipStructure> {
    if structure.is_dense() {
        Cow::Borrowed(structure)
    } else {
        tracing::debug!(
            max_id = structure.group_count(),
            "renumbering sparse group ids"
        );
        Cow::Owned(structure.compacted())
    }
}
