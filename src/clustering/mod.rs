//! Clustering strategies.
//!
//! Every strategy turns a similarity-derived input into a
//! [`MembershipStructure`]. Soft strategies first produce a class-by-group
//! affinity matrix which [`discretize`] turns into memberships, so a sweep
//! over thresholds can reuse one affinity matrix.

pub mod dbscan;
pub mod fuzzy;
pub mod mds;
pub mod overlapping;

use crate::errors::{Error, Result};
use crate::membership::{Membership, MembershipStructure};
use ndarray::Array2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use dbscan::Dbscan;
pub use fuzzy::FuzzyCMeans;
pub use overlapping::{OverlappingGnn, TrainingReport};

/// What a strategy clusters.
#[derive(Debug, Clone, Copy)]
pub enum ClusteringInput<'a> {
    /// Precomputed pairwise distances.
    Distance(&'a Array2<f64>),
    /// Binary adjacency plus one feature row per class.
    Graph {
        adjacency: &'a Array2<f64>,
        features: &'a Array2<f64>,
    },
}

impl ClusteringInput<'_> {
    /// Number of classes; validates matrix shapes.
    pub fn n_classes(&self) -> Result<usize> {
        let n = match self {
            Self::Distance(distance) => {
                check_square(distance)?;
                distance.nrows()
            }
            Self::Graph {
                adjacency,
                features,
            } => {
                check_square(adjacency)?;
                if features.nrows() != adjacency.nrows() {
                    return Err(Error::DimensionMismatch {
                        expected: adjacency.nrows(),
                        found: features.nrows(),
                    });
                }
                adjacency.nrows()
            }
        };
        if n == 0 {
            return Err(Error::EmptyInput("no classes to cluster"));
        }
        Ok(n)
    }
}

fn check_square(matrix: &Array2<f64>) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::DimensionMismatch {
            expected: matrix.nrows(),
            found: matrix.ncols(),
        });
    }
    Ok(())
}

/// A clustering strategy.
pub trait Clustering {
    fn name(&self) -> &'static str;

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<MembershipStructure>;
}

/// Strategies producing a continuous class-by-group affinity.
pub trait SoftClustering: Clustering {
    /// `n_classes x n_groups` affinity matrix.
    fn affinities(&self, input: &ClusteringInput<'_>) -> Result<Array2<f64>>;
}

/// How continuous affinities become memberships.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Discretization {
    /// Every group whose affinity reaches the threshold.
    Threshold(f64),
    /// The single strongest group.
    Max,
}

impl fmt::Display for Discretization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threshold(t) => write!(f, "{t}"),
            Self::Max => f.write_str("max"),
        }
    }
}

/// Reports write a threshold as its number and the hard policy as `"max"`.
impl Serialize for Discretization {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Threshold(t) => serializer.serialize_f64(*t),
            Self::Max => serializer.serialize_str("max"),
        }
    }
}

impl<'de> Deserialize<'de> for Discretization {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(f64),
            Name(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(t) => Ok(Self::Threshold(t)),
            Wire::Name(name) if name.eq_ignore_ascii_case("max") => Ok(Self::Max),
            Wire::Name(name) => Err(serde::de::Error::custom(format!(
                "expected a number or \"max\", found \"{name}\""
            ))),
        }
    }
}

/// Turn affinities into memberships and compact the group ids.
///
/// With a threshold, a class joins every group whose affinity is at least
/// the threshold. With `Max`, a class joins its strongest group (lowest
/// index on ties) unless every affinity is zero: an all-zero row is
/// unassigned, never group 0, so a class with no affinity anywhere is not
/// counted as a member by SM, NED or Precision. Classes that join nothing
/// are unassigned.
pub fn discretize(affinities: &Array2<f64>, policy: Discretization) -> MembershipStructure {
    let memberships: MembershipStructure = affinities
        .rows()
        .into_iter()
        .map(|row| match policy {
            Discretization::Threshold(threshold) => Membership::from_groups(
                row.iter()
                    .enumerate()
                    .filter(|(_, &a)| a >= threshold)
                    .map(|(group, _)| group),
            ),
            Discretization::Max => row
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f64)>, (group, &a)| match best {
                    Some((_, best_a)) if best_a >= a => best,
                    _ => Some((group, a)),
                })
                .filter(|(_, a)| *a > 0.0)
                .map_or(Membership::Unassigned, |(group, _)| Membership::single(group)),
        })
        .collect();
    memberships.compacted()
}
