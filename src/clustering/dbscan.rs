//! Density-based clustering over precomputed distances.
//!
//! Two classes are neighbours when their distance is at most `epsilon`. A
//! class with at least `min_samples` neighbours (itself included) is a core
//! class; groups grow from core classes through their neighbours. Classes no
//! core class reaches stay unassigned.
//!
//! Running the same distances over increasing `epsilon` values gives a
//! hierarchy of decomposition layers, see [`Dbscan::layers`].

use super::{Clustering, ClusteringInput};
use crate::errors::{Error, Result};
use crate::membership::MembershipStructure;
use ndarray::Array2;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct Dbscan {
    epsilon: f64,
    min_samples: usize,
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::new(0.5, 2)
    }
}

impl Dbscan {
    pub fn new(epsilon: f64, min_samples: usize) -> Self {
        Self {
            epsilon,
            min_samples,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    fn validate(&self) -> Result<()> {
        if !(self.epsilon > 0.0) {
            return Err(Error::invalid_parameter("epsilon", "must be positive"));
        }
        if self.min_samples == 0 {
            return Err(Error::invalid_parameter("min_samples", "must be at least 1"));
        }
        Ok(())
    }

    /// Neighbours of `point` within epsilon, excluding the point itself.
    fn region_query(&self, distance: &Array2<f64>, point: usize) -> Vec<usize> {
        distance
            .row(point)
            .iter()
            .enumerate()
            .filter(|(other, &d)| *other != point && d <= self.epsilon)
            .map(|(other, _)| other)
            .collect()
    }

    /// Group labels, `None` for unreachable classes.
    pub fn labels(&self, distance: &Array2<f64>) -> Result<Vec<Option<usize>>> {
        self.validate()?;
        let n = ClusteringInput::Distance(distance).n_classes()?;

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut next_group = 0;

        for point in 0..n {
            if visited[point] {
                continue;
            }
            visited[point] = true;

            let neighbours = self.region_query(distance, point);
            if neighbours.len() + 1 < self.min_samples {
                continue;
            }

            let group = next_group;
            next_group += 1;
            labels[point] = Some(group);

            let mut queue: VecDeque<usize> = neighbours.into();
            while let Some(neighbour) = queue.pop_front() {
                if labels[neighbour].is_none() {
                    labels[neighbour] = Some(group);
                }
                if visited[neighbour] {
                    continue;
                }
                visited[neighbour] = true;

                let reach = self.region_query(distance, neighbour);
                if reach.len() + 1 >= self.min_samples {
                    queue.extend(reach.into_iter().filter(|&p| !visited[p]));
                }
            }
        }

        tracing::debug!(
            epsilon = self.epsilon,
            min_samples = self.min_samples,
            groups = next_group,
            "density clustering finished"
        );
        Ok(labels)
    }

    /// One layer per epsilon, sharing `min_samples`.
    pub fn layers(
        &self,
        distance: &Array2<f64>,
        epsilons: &[f64],
    ) -> Result<Vec<MembershipStructure>> {
        epsilons
            .iter()
            .map(|&epsilon| {
                self.clone()
                    .with_epsilon(epsilon)
                    .cluster(&ClusteringInput::Distance(distance))
            })
            .collect()
    }
}

impl Clustering for Dbscan {
    fn name(&self) -> &'static str {
        "density"
    }

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<MembershipStructure> {
        match input {
            ClusteringInput::Distance(distance) => {
                Ok(MembershipStructure::from_labels(&self.labels(distance)?))
            }
            ClusteringInput::Graph { .. } => Err(Error::invalid_parameter(
                "input",
                "density clustering needs a distance matrix",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Membership;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn two_pairs() -> Array2<f64> {
        array![
            [0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
            [1.0, 1.0, 0.0, 0.1],
            [1.0, 1.0, 0.1, 0.0],
        ]
    }

    #[test]
    fn test_pairs_form_separate_groups() {
        let labels = Dbscan::new(0.01, 1).labels(&two_pairs()).unwrap();
        assert_eq!(labels, vec![Some(0), Some(0), Some(1), Some(2)]);

        let labels = Dbscan::new(0.1, 2).labels(&two_pairs()).unwrap();
        assert_eq!(labels, vec![Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_sparse_points_are_unassigned() {
        let m = Dbscan::new(0.01, 2)
            .cluster(&ClusteringInput::Distance(&two_pairs()))
            .unwrap();
        assert_eq!(
            m.as_slice(),
            &[
                Membership::single(0),
                Membership::single(0),
                Membership::Unassigned,
                Membership::Unassigned,
            ]
        );
    }

    #[test]
    fn test_border_point_joins_group() {
        // 0-1-2 chain: only 1 is core with min_samples = 3.
        let distance = array![[0.0, 0.2, 0.9], [0.2, 0.0, 0.2], [0.9, 0.2, 0.0]];
        let labels = Dbscan::new(0.25, 3).labels(&distance).unwrap();
        assert_eq!(labels, vec![Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn test_layers_merge_as_epsilon_grows() {
        let layers = Dbscan::new(0.01, 1)
            .layers(&two_pairs(), &[0.01, 0.5, 1.0])
            .unwrap();
        let group_counts: Vec<usize> = layers.iter().map(|l| l.group_count()).collect();
        assert_eq!(group_counts, vec![3, 2, 1]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Dbscan::new(0.0, 1).labels(&two_pairs()).is_err());
        assert!(Dbscan::new(0.1, 0).labels(&two_pairs()).is_err());
    }
}
