//! Pairwise class similarity.
//!
//! Structural similarity comes from resolved call traffic, semantic
//! similarity from the words (or external embeddings) of each class, and
//! [`fusion`] blends the two into the matrix the clustering strategies use.

pub mod fusion;
pub mod preprocess;
pub mod semantic;
pub mod structural;

use crate::errors::{Error, Result};
use ndarray::Array2;

pub use fusion::{fuse, fuse_with};
pub use semantic::{
    cosine_similarity, EmbeddingBackend, PrecomputedBackend, SemanticSimilarity, SemanticSource,
    TfIdfBackend,
};
pub use structural::{call_adjacency, structural_similarity};

/// Square, symmetric matrix with a zero diagonal and values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    values: Array2<f64>,
}

impl SimilarityMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            values: Array2::zeros((n, n)),
        }
    }

    /// Evaluate `pair(i, j)` for `i < j` only and mirror it.
    ///
    /// Results are clamped to `[0, 1]`; NaN becomes 0.
    pub fn from_upper_triangle(n: usize, mut pair: impl FnMut(usize, usize) -> f64) -> Self {
        let mut values = Array2::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let value = clamp_unit(pair(i, j));
                values[[i, j]] = value;
                values[[j, i]] = value;
            }
        }
        Self { values }
    }

    /// Adopt an externally built matrix, keeping only its upper triangle.
    pub fn from_array(values: Array2<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != cols {
            return Err(Error::DimensionMismatch {
                expected: rows,
                found: cols,
            });
        }
        Ok(Self::from_upper_triangle(rows, |i, j| values[[i, j]]))
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    /// `1 - similarity` off the diagonal, 0 on it.
    pub fn to_distance(&self) -> Array2<f64> {
        let mut distance = self.values.mapv(|s| 1.0 - s);
        distance.diag_mut().fill(0.0);
        distance
    }

    /// Binary form: 1 wherever the similarity is non-zero.
    pub fn to_binary(&self) -> Array2<f64> {
        self.values.mapv(|s| if s > 0.0 { 1.0 } else { 0.0 })
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_upper_triangle_is_mirrored() {
        let mut evaluated = Vec::new();
        let m = SimilarityMatrix::from_upper_triangle(3, |i, j| {
            evaluated.push((i, j));
            (i + j) as f64 / 10.0
        });
        assert_eq!(evaluated, vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(m.get(2, 1), m.get(1, 2));
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn test_values_are_clamped() {
        let m = SimilarityMatrix::from_upper_triangle(2, |_, _| 1.7);
        assert_eq!(m.get(0, 1), 1.0);
        let m = SimilarityMatrix::from_upper_triangle(2, |_, _| f64::NAN);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn test_distance_has_zero_diagonal() {
        let m = SimilarityMatrix::from_array(array![[0.0, 0.25], [0.25, 0.0]]).unwrap();
        let d = m.to_distance();
        assert_eq!(d, array![[0.0, 0.75], [0.75, 0.0]]);
    }

    #[test]
    fn test_non_square_rejected() {
        let err = SimilarityMatrix::from_array(Array2::zeros((2, 3))).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }
}
