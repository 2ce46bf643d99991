//! Embedding similarity and normalization.

use sg_types::GraphError;

/// Dimensionality every embedding in this system carries.
pub const EMBEDDING_DIM: usize = 384;

/// Tolerance band around unit magnitude, per spec.
const MAGNITUDE_TOLERANCE: f32 = 1e-4;

/// An L2-normalized embedding vector. A plain alias, not a newtype: the
/// invariant (unit magnitude) is checked at the boundaries that produce or
/// consume one (`l2_normalize`, `assert_unit_magnitude`), not on every
/// arithmetic step.
pub type Embedding = Vec<f32>;

/// Inner product of two vectors. On L2-normalized inputs this equals
/// cosine similarity.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
#[must_use]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize `v` to unit length in place.
///
/// # Errors
/// `EmptyInput` if `v` is the zero vector (cannot be normalized).
pub fn l2_normalize(v: &mut [f32]) -> Result<(), GraphError> {
    let mag = magnitude(v);
    if mag == 0.0 {
        return Err(GraphError::EmptyInput(
            "cannot L2-normalize a zero vector".to_string(),
        ));
    }
    for x in v.iter_mut() {
        *x /= mag;
    }
    Ok(())
}

/// Check that `v`'s magnitude falls within `[1 - 1e-4, 1 + 1e-4]`.
///
/// # Errors
/// `IntegrityViolation` when the magnitude is out of tolerance.
pub fn assert_unit_magnitude(v: &[f32]) -> Result<(), GraphError> {
    let mag = magnitude(v);
    if (mag - 1.0).abs() > MAGNITUDE_TOLERANCE {
        return Err(GraphError::IntegrityViolation(format!(
            "embedding magnitude {mag} outside [{}, {}]",
            1.0 - MAGNITUDE_TOLERANCE,
            1.0 + MAGNITUDE_TOLERANCE
        )));
    }
    Ok(())
}
