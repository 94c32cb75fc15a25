//! Classical (Torgerson) multi-dimensional scaling.
//!
//! Distances are double-centred into a Gram matrix whose leading
//! eigenvectors, scaled by the square root of their eigenvalues, give the
//! low-dimensional coordinates.

use crate::errors::{Error, Result};
use faer::{Mat, Side};
use ndarray::{Array1, Array2, Axis};

const EIGEN_TOLERANCE: f64 = 1e-10;

/// Embed a distance matrix into `dims` coordinates per row.
///
/// Columns past the number of positive eigenvalues are zero.
pub fn classical_mds(distance: &Array2<f64>, dims: usize) -> Result<Array2<f64>> {
    let n = distance.nrows();
    if n != distance.ncols() {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: distance.ncols(),
        });
    }
    if dims == 0 {
        return Err(Error::invalid_parameter("dims", "must be at least 1"));
    }
    let mut coordinates = Array2::zeros((n, dims));
    if n == 0 {
        return Ok(coordinates);
    }

    let gram = double_center(distance);
    let gram = Mat::<f64>::from_fn(n, n, |i, j| gram[[i, j]]);
    let eigen = gram
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| Error::Numerical(format!("eigendecomposition failed: {e:?}")))?;
    let values = eigen.S().column_vector();
    let vectors = eigen.U();

    // Eigenvalues come back in non-decreasing order.
    let largest = (0..n).map(|i| values[i].abs()).fold(0.0, f64::max);
    let cutoff = EIGEN_TOLERANCE * largest.max(1.0);
    for k in 0..dims.min(n) {
        let index = n - 1 - k;
        let value = values[index];
        if value <= cutoff {
            break;
        }
        let scale = value.sqrt();
        for i in 0..n {
            coordinates[[i, k]] = vectors[(i, index)] * scale;
        }
    }
    Ok(coordinates)
}

/// `-1/2 * J D^2 J` with `J` the centring matrix.
fn double_center(distance: &Array2<f64>) -> Array2<f64> {
    let squared = distance.mapv(|d| d * d);
    let row_means = squared.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(0));
    let col_means = squared.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(0));
    let grand_mean = squared.mean().unwrap_or(0.0);
    Array2::from_shape_fn(squared.dim(), |(i, j)| {
        -0.5 * (squared[[i, j]] - row_means[i] - col_means[j] + grand_mean)
    })
}
