//! Fuzzy c-means on an MDS embedding of the distance matrix.
//!
//! Distances are embedded into two coordinates per class, fuzzy c-means with
//! fuzzifier `m = 2` produces a membership degree per (class, group), and
//! the degrees of several seeded runs are averaged.

use super::mds::classical_mds;
use super::{discretize, Clustering, ClusteringInput, Discretization, SoftClustering};
use crate::errors::{Error, Result};
use crate::membership::MembershipStructure;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MIN_DISTANCE: f64 = f64::EPSILON;

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyCMeans {
    n_clusters: usize,
    discretization: Discretization,
    repeats: usize,
    seed: u64,
    fuzzifier: f64,
    dims: usize,
    max_iterations: usize,
    tolerance: f64,
}

impl FuzzyCMeans {
    pub fn new(n_clusters: usize, discretization: Discretization) -> Self {
        Self {
            n_clusters,
            discretization,
            repeats: 1,
            seed: 42,
            fuzzifier: 2.0,
            dims: 2,
            max_iterations: 1000,
            tolerance: 1e-9,
        }
    }

    /// Number of seeded runs whose degrees are averaged.
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_discretization(mut self, discretization: Discretization) -> Self {
        self.discretization = discretization;
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Membership degrees (`n_clusters x n_points`) of one run.
    fn run(&self, points: &Array2<f64>, seed: u64) -> Array2<f64> {
        let n = points.nrows();
        let k = self.n_clusters;
        let exponent = 2.0 / (self.fuzzifier - 1.0);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut degrees = Array2::from_shape_fn((k, n), |_| rng.gen::<f64>());
        normalize_columns(&mut degrees);

        for iteration in 0..self.max_iterations {
            let weights = degrees.mapv(|u| u.powf(self.fuzzifier));
            let totals = weights.sum_axis(Axis(1));
            let mut centers = weights.dot(points);
            for (mut center, total) in centers.axis_iter_mut(Axis(0)).zip(totals.iter()) {
                if *total > 0.0 {
                    center.mapv_inplace(|c| c / total);
                }
            }

            let mut next = Array2::from_shape_fn((k, n), |(c, p)| {
                let diff = &centers.row(c) - &points.row(p);
                diff.dot(&diff).sqrt().max(MIN_DISTANCE).powf(-exponent)
            });
            normalize_columns(&mut next);

            let change = (&next - &degrees).mapv(|v| v * v).sum().sqrt();
            degrees = next;
            if change < self.tolerance {
                tracing::trace!(iteration, "fuzzy c-means converged");
                break;
            }
        }
        degrees
    }
}

fn normalize_columns(matrix: &mut Array2<f64>) {
    for mut column in matrix.axis_iter_mut(Axis(1)) {
        let total = column.sum();
        if total > 0.0 {
            column.mapv_inplace(|v| v / total);
        }
    }
}

impl Clustering for FuzzyCMeans {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<MembershipStructure> {
        Ok(discretize(&self.affinities(input)?, self.discretization))
    }
}

impl SoftClustering for FuzzyCMeans {
    fn affinities(&self, input: &ClusteringInput<'_>) -> Result<Array2<f64>> {
        let ClusteringInput::Distance(distance) = input else {
            return Err(Error::invalid_parameter(
                "input",
                "fuzzy clustering needs a distance matrix",
            ));
        };
        let n = input.n_classes()?;
        if self.n_clusters == 0 || self.n_clusters > n {
            return Err(Error::InvalidClusterCount {
                requested: self.n_clusters,
                n_items: n,
            });
        }
        if self.repeats == 0 {
            return Err(Error::invalid_parameter("repeats", "must be at least 1"));
        }

        let _span = tracing::debug_span!(
            "fuzzy_c_means",
            n_clusters = self.n_clusters,
            repeats = self.repeats
        )
        .entered();
        let points = classical_mds(distance, self.dims)?;
        let mut total = Array2::zeros((self.n_clusters, n));
        for repeat in 0..self.repeats {
            total += &self.run(&points, self.seed.wrapping_add(repeat as u64));
        }
        total.mapv_inplace(|v| v / self.repeats as f64);
        Ok(total.reversed_axes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Membership;
    use ndarray::array;

    fn two_pairs() -> Array2<f64> {
        array![
            [0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
            [1.0, 1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0, 0.0],
        ]
    }

    #[test]
    fn test_degrees_sum_to_one_per_class() {
        let fcm = FuzzyCMeans::new(2, Discretization::Max).with_repeats(3);
        let affinities = fcm.affinities(&ClusteringInput::Distance(&two_pairs())).unwrap();
        assert_eq!(affinities.dim(), (4, 2));
        for row in affinities.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_hard_mode_separates_pairs() {
        let m = FuzzyCMeans::new(2, Discretization::Max)
            .cluster(&ClusteringInput::Distance(&two_pairs()))
            .unwrap();
        assert_eq!(m.get(0), m.get(1));
        assert_eq!(m.get(2), m.get(3));
        assert_ne!(m.get(0), m.get(2));
        assert!(m.iter().all(|membership| membership.len() == 1));
    }

    #[test]
    fn test_zero_threshold_assigns_every_group() {
        let m = FuzzyCMeans::new(2, Discretization::Threshold(0.0))
            .cluster(&ClusteringInput::Distance(&two_pairs()))
            .unwrap();
        assert!(m.iter().all(|membership| *membership == Membership::from_groups([0, 1])));
    }

    #[test]
    fn test_too_many_clusters_rejected() {
        let err = FuzzyCMeans::new(5, Discretization::Max)
            .affinities(&ClusteringInput::Distance(&two_pairs()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidClusterCount {
                requested: 5,
                n_items: 4
            }
        ));
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let fcm = FuzzyCMeans::new(2, Discretization::Max).with_seed(7);
        let input = ClusteringInput::Distance(&two_pairs());
        assert_eq!(fcm.affinities(&input).unwrap(), fcm.affinities(&input).unwrap());
    }
}
