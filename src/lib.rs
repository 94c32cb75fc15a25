//! Candidate microservice extraction for object-oriented monoliths.
//!
//! A parsed class graph is turned into structural and semantic similarity
//! matrices, fused, and clustered into possibly overlapping groups. Every
//! grouping, including a ground-truth one, can be scored with the
//! evaluation suite.

pub mod cli;
pub mod clustering;
pub mod commands;
pub mod config;
pub mod errors;
pub mod evaluation;
pub mod graph;
pub mod membership;
pub mod progress;
pub mod report;
pub mod similarity;
pub mod sweep;

pub use crate::errors::{Error, Result};
pub use crate::evaluation::{EvaluationSuite, Metric, MetricScores};
pub use crate::graph::{ClassGraph, ClassRecord, GroundTruth, GroundTruthSource, ParsedClasses};
pub use crate::membership::{Membership, MembershipStructure};
pub use crate::report::{SweepRecord, ThresholdSweepResult};
pub use crate::similarity::{SemanticSimilarity, SimilarityMatrix};
pub use crate::sweep::{Algorithm, ClusterCounts, ClusteringRequest, SweepRunner};
