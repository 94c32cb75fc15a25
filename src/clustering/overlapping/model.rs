//! Two-layer graph convolution network.
//!
//! `H = relu(Â X W1 + b1)` and `Z = relu(Â H W2 + b2)`, where `Â` is the
//! symmetrically normalised adjacency with self-loops and `X` the input
//! features. `Z` holds one non-negative affinity per (class, group).

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

/// Fixed inputs shared by every forward pass.
#[derive(Debug, Clone)]
pub struct GraphContext {
    /// `D^-1/2 (A + I) D^-1/2`.
    pub normalized_adjacency: Array2<f64>,
    /// `Â X`, constant because the first layer sees fixed inputs.
    pub propagated_features: Array2<f64>,
}

impl GraphContext {
    pub fn new(adjacency: &Array2<f64>, features: &Array2<f64>) -> Self {
        let normalized_adjacency = normalize_adjacency(adjacency);
        let propagated_features = normalized_adjacency.dot(features);
        Self {
            normalized_adjacency,
            propagated_features,
        }
    }
}

pub fn normalize_adjacency(adjacency: &Array2<f64>) -> Array2<f64> {
    let mut with_loops = adjacency.clone();
    with_loops.diag_mut().fill(1.0);
    let inv_sqrt_degree: Array1<f64> = with_loops
        .sum_axis(Axis(1))
        .mapv(|d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 });
    Array2::from_shape_fn(with_loops.dim(), |(i, j)| {
        inv_sqrt_degree[i] * with_loops[[i, j]] * inv_sqrt_degree[j]
    })
}

/// Intermediate values kept for the backward pass.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    hidden_pre: Array2<f64>,
    propagated_hidden: Array2<f64>,
    output_pre: Array2<f64>,
    pub output: Array2<f64>,
}

/// Parameter gradients, same shapes as [`GraphConvNet`]'s fields.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub w1: Array2<f64>,
    pub b1: Array1<f64>,
    pub w2: Array2<f64>,
    pub b2: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphConvNet {
    pub w1: Array2<f64>,
    pub b1: Array1<f64>,
    pub w2: Array2<f64>,
    pub b2: Array1<f64>,
}

impl GraphConvNet {
    /// Glorot-uniform weights and zero biases.
    pub fn new(inputs: usize, hidden: usize, outputs: usize, rng: &mut StdRng) -> Self {
        Self {
            w1: glorot_uniform(inputs, hidden, rng),
            b1: Array1::zeros(hidden),
            w2: glorot_uniform(hidden, outputs, rng),
            b2: Array1::zeros(outputs),
        }
    }

    pub fn forward(&self, context: &GraphContext) -> ForwardPass {
        let hidden_pre = context.propagated_features.dot(&self.w1) + &self.b1;
        let hidden = hidden_pre.mapv(relu);
        let propagated_hidden = context.normalized_adjacency.dot(&hidden);
        let output_pre = propagated_hidden.dot(&self.w2) + &self.b2;
        let output = output_pre.mapv(relu);
        ForwardPass {
            hidden_pre,
            propagated_hidden,
            output_pre,
            output,
        }
    }

    /// Gradients of a loss given `d loss / d output`, plus L2 weight decay
    /// `weight_decay * (|W1|^2 + |W2|^2)` on the weights only.
    pub fn backward(
        &self,
        context: &GraphContext,
        pass: &ForwardPass,
        output_gradient: &Array2<f64>,
        weight_decay: f64,
    ) -> Gradients {
        let d_output_pre = output_gradient * &pass.output_pre.mapv(relu_derivative);
        let w2 = pass.propagated_hidden.t().dot(&d_output_pre) + &(&self.w2 * (2.0 * weight_decay));
        let b2 = d_output_pre.sum_axis(Axis(0));

        // Â is symmetric, so it is its own transpose.
        let d_hidden = context
            .normalized_adjacency
            .dot(&d_output_pre.dot(&self.w2.t()));
        let d_hidden_pre = d_hidden * &pass.hidden_pre.mapv(relu_derivative);
        let w1 = context.propagated_features.t().dot(&d_hidden_pre)
            + &(&self.w1 * (2.0 * weight_decay));
        let b1 = d_hidden_pre.sum_axis(Axis(0));

        Gradients { w1, b1, w2, b2 }
    }

    pub fn weight_penalty(&self, weight_decay: f64) -> f64 {
        weight_decay * (self.w1.mapv(|w| w * w).sum() + self.w2.mapv(|w| w * w).sum())
    }
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn glorot_uniform(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..=limit))
}
