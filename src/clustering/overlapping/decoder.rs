//! Bernoulli-Poisson link decoder.
//!
//! The probability that classes `u` and `v` are linked is
//! `1 - exp(-z_u . z_v)`. The loss balances edges and non-edges: the mean
//! negative log-likelihood over edges and the mean over non-edges get equal
//! weight.

use ndarray::Array2;

const EPS: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct BernoulliPoissonDecoder {
    adjacency: Array2<f64>,
    n_edges: usize,
    n_non_edges: usize,
}

impl BernoulliPoissonDecoder {
    /// `adjacency` is symmetric and binary; the diagonal is ignored.
    pub fn new(adjacency: &Array2<f64>) -> Self {
        let n = adjacency.nrows();
        let n_edges = adjacency
            .indexed_iter()
            .filter(|((u, v), &a)| u != v && a > 0.0)
            .count();
        Self {
            adjacency: adjacency.clone(),
            n_edges,
            n_non_edges: (n * n).saturating_sub(n + n_edges),
        }
    }

    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    fn is_edge(&self, u: usize, v: usize) -> bool {
        u != v && self.adjacency[[u, v]] > 0.0
    }

    fn edge_scale(&self) -> f64 {
        if self.n_edges == 0 {
            0.0
        } else {
            1.0 / (2.0 * self.n_edges as f64)
        }
    }

    fn non_edge_scale(&self) -> f64 {
        if self.n_non_edges == 0 {
            0.0
        } else {
            1.0 / (2.0 * self.n_non_edges as f64)
        }
    }

    /// Balanced loss of the embedding `z` (one row per class).
    pub fn loss(&self, z: &Array2<f64>) -> f64 {
        let dots = z.dot(&z.t());
        let n = z.nrows();
        let (edge_scale, non_edge_scale) = (self.edge_scale(), self.non_edge_scale());
        let mut loss = 0.0;
        for u in 0..n {
            for v in 0..n {
                if u == v {
                    continue;
                }
                let dot = dots[[u, v]];
                if self.is_edge(u, v) {
                    loss -= edge_scale * (-(-EPS - dot).exp_m1()).ln();
                } else {
                    loss += non_edge_scale * dot;
                }
            }
        }
        loss
    }

    /// Loss and its gradient with respect to `z`.
    pub fn loss_and_gradient(&self, z: &Array2<f64>) -> (f64, Array2<f64>) {
        let dots = z.dot(&z.t());
        let n = z.nrows();
        let (edge_scale, non_edge_scale) = (self.edge_scale(), self.non_edge_scale());
        let mut loss = 0.0;
        let mut pair_gradient = Array2::zeros((n, n));
        for u in 0..n {
            for v in 0..n {
                if u == v {
                    continue;
                }
                let dot = dots[[u, v]];
                if self.is_edge(u, v) {
                    loss -= edge_scale * (-(-EPS - dot).exp_m1()).ln();
                    pair_gradient[[u, v]] = -edge_scale / (EPS + dot).exp_m1();
                } else {
                    loss += non_edge_scale * dot;
                    pair_gradient[[u, v]] = non_edge_scale;
                }
            }
        }
        // The pair gradient is symmetric, so both dot-product slots add up.
        let gradient = pair_gradient.dot(z) * 2.0;
        (loss, gradient)
    }
}
