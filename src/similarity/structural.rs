//! Call-traffic similarity.
//!
//! Two classes are close when a large share of the calls each one receives
//! comes from the other. Raw counts are not used, so a utility class that
//! everybody calls does not become similar to everything.

use super::SimilarityMatrix;
use crate::graph::{CallMatrix, ClassGraph};
use ndarray::Array2;

/// Similarity of one class pair.
///
/// With `calls_in` the number of calls a class receives from other classes:
/// - both sides received calls: mean of the two proportions,
/// - one side received none: the proportion for the other side alone,
/// - neither received any: 0.
pub fn pair_similarity(calls: &CallMatrix, i: usize, j: usize) -> f64 {
    let in_i = calls.calls_in(i);
    let in_j = calls.calls_in(j);
    let i_to_j = f64::from(calls.calls(i, j));
    let j_to_i = f64::from(calls.calls(j, i));

    match (in_i, in_j) {
        (0, 0) => 0.0,
        (0, in_j) => i_to_j / f64::from(in_j),
        (in_i, 0) => j_to_i / f64::from(in_i),
        (in_i, in_j) => 0.5 * (i_to_j / f64::from(in_j) + j_to_i / f64::from(in_i)),
    }
}

pub fn structural_similarity(graph: &ClassGraph) -> SimilarityMatrix {
    let _span = tracing::info_span!("structural_similarity", classes = graph.len()).entered();
    let calls = graph.call_matrix();
    SimilarityMatrix::from_upper_triangle(graph.len(), |i, j| pair_similarity(calls, i, j))
}

/// Symmetric 0/1 adjacency: 1 where either class calls the other.
pub fn call_adjacency(graph: &ClassGraph) -> Array2<f64> {
    let n = graph.len();
    let calls = graph.call_matrix();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i != j && (calls.calls(i, j) > 0 || calls.calls(j, i) > 0) {
            1.0
        } else {
            0.0
        }
    })
}
