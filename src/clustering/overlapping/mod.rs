//! Overlapping group detection with a graph convolution network.
//!
//! The network sees each class's features next to its adjacency row and is
//! trained to reconstruct the adjacency through a Bernoulli-Poisson link
//! decoder. Its non-negative output is a per-class, per-group affinity, so a
//! class can score high for several groups at once.
//!
//! Training is full-batch and deterministic for a given seed. Dropout and
//! batch normalisation are not used.

pub mod decoder;
pub mod model;
pub mod training;

use super::{discretize, Clustering, ClusteringInput, Discretization, SoftClustering};
use crate::errors::{Error, Result};
use crate::membership::MembershipStructure;
use decoder::BernoulliPoissonDecoder;
use model::GraphContext;
use ndarray::{concatenate, Array2, Axis};

pub use training::{EarlyStopping, TrainingConfig, TrainingReport};

#[derive(Debug, Clone, PartialEq)]
pub struct OverlappingGnn {
    n_clusters: usize,
    discretization: Discretization,
    training: TrainingConfig,
}

impl OverlappingGnn {
    pub fn new(n_clusters: usize, discretization: Discretization) -> Self {
        Self {
            n_clusters,
            discretization,
            training: TrainingConfig::default(),
        }
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_discretization(mut self, discretization: Discretization) -> Self {
        self.discretization = discretization;
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Train and return the `n_classes x n_clusters` affinities together with
    /// the training outcome.
    pub fn fit(&self, input: &ClusteringInput<'_>) -> Result<(Array2<f64>, TrainingReport)> {
        let ClusteringInput::Graph {
            adjacency,
            features,
        } = input
        else {
            return Err(Error::invalid_parameter(
                "input",
                "overlapping clustering needs an adjacency and features",
            ));
        };
        let n = input.n_classes()?;
        if self.n_clusters == 0 || self.n_clusters > n {
            return Err(Error::InvalidClusterCount {
                requested: self.n_clusters,
                n_items: n,
            });
        }
        if self.training.hidden_size == 0 {
            return Err(Error::invalid_parameter("hidden_size", "must be at least 1"));
        }

        let _span = tracing::info_span!(
            "overlapping_gnn",
            n_clusters = self.n_clusters,
            classes = n
        )
        .entered();
        let inputs = concatenate(Axis(1), &[features.view(), adjacency.view()]).map_err(|_| {
            Error::DimensionMismatch {
                expected: n,
                found: features.nrows(),
            }
        })?;
        let context = GraphContext::new(adjacency, &inputs);
        let decoder = BernoulliPoissonDecoder::new(adjacency);
        let (net, report) = training::train(&context, &decoder, self.n_clusters, &self.training);
        tracing::info!(
            epochs = report.epochs_run,
            stopped_early = report.stopped_early,
            best_validation_loss = report.best_validation_loss,
            "training finished"
        );
        Ok((net.forward(&context).output, report))
    }
}

impl Clustering for OverlappingGnn {
    fn name(&self) -> &'static str {
        "overlapping-gnn"
    }

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<MembershipStructure> {
        Ok(discretize(&self.affinities(input)?, self.discretization))
    }
}

impl SoftClustering for OverlappingGnn {
    fn affinities(&self, input: &ClusteringInput<'_>) -> Result<Array2<f64>> {
        self.fit(input).map(|(affinities, _)| affinities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_training() -> TrainingConfig {
        TrainingConfig {
            hidden_size: 8,
            max_epochs: 50,
            validation_interval: 5,
            learning_rate: 1e-2,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_affinities_shape_and_sign() {
        let adjacency = array![
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 0.0],
        ];
        let features = array![[1.0], [0.5], [0.5], [1.0]];
        let gnn = OverlappingGnn::new(2, Discretization::Max).with_training(small_training());
        let input = ClusteringInput::Graph {
            adjacency: &adjacency,
            features: &features,
        };
        let (affinities, report) = gnn.fit(&input).unwrap();
        assert_eq!(affinities.dim(), (4, 2));
        assert!(affinities.iter().all(|&a| a >= 0.0));
        assert!(report.epochs_run <= 51);

        // Same seed, same result.
        assert_eq!(gnn.affinities(&input).unwrap(), affinities);
    }

    #[test]
    fn test_distance_input_rejected() {
        let distance = Array2::zeros((2, 2));
        let gnn = OverlappingGnn::new(1, Discretization::Max);
        assert!(gnn.cluster(&ClusteringInput::Distance(&distance)).is_err());
    }

    #[test]
    fn test_cluster_count_bounded_by_classes() {
        let adjacency = Array2::zeros((2, 2));
        let features = Array2::zeros((2, 1));
        let gnn = OverlappingGnn::new(3, Discretization::Max);
        let err = gnn
            .fit(&ClusteringInput::Graph {
                adjacency: &adjacency,
                features: &features,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidClusterCount { .. }));
    }
}
