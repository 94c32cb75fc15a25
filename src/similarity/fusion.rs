//! Blending structural and semantic similarity.

use super::SimilarityMatrix;
use crate::errors::{Error, Result};

/// `alpha * structural + (1 - alpha) * semantic`.
pub fn fuse(
    alpha: f64,
    structural: &SimilarityMatrix,
    semantic: &SimilarityMatrix,
) -> Result<SimilarityMatrix> {
    fuse_with(alpha, || Ok(structural.clone()), || Ok(semantic.clone()))
}

/// Like [`fuse`], but the inputs are produced on demand: at `alpha == 1` the
/// semantic side is never computed and at `alpha == 0` the structural side
/// is never computed.
pub fn fuse_with<S, T>(alpha: f64, structural: S, semantic: T) -> Result<SimilarityMatrix>
where
    S: FnOnce() -> Result<SimilarityMatrix>,
    T: FnOnce() -> Result<SimilarityMatrix>,
{
    if !(0.0..=1.0).contains(&alpha) {
        return Err(Error::invalid_parameter(
            "alpha",
            format!("{alpha} is outside [0, 1]"),
        ));
    }
    if alpha == 1.0 {
        return structural();
    }
    if alpha == 0.0 {
        return semantic();
    }

    let structural = structural()?;
    let semantic = semantic()?;
    if structural.len() != semantic.len() {
        return Err(Error::DimensionMismatch {
            expected: structural.len(),
            found: semantic.len(),
        });
    }
    let s = structural.as_array();
    let t = semantic.as_array();
    Ok(SimilarityMatrix::from_upper_triangle(structural.len(), |i, j| {
        alpha * s[[i, j]] + (1.0 - alpha) * t[[i, j]]
    }))
}
