//! Vector similarity.

use crate::error::EmbeddingError;

/// Cosine similarity = (a · b) / (||a|| * ||b||), in `[-1, 1]`.
///
/// Zero vectors have similarity 0 with everything. Extra trailing
/// components of the longer vector are ignored; use
/// [`checked_cosine_similarity`] when lengths must agree.
#[inline]
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Cosine similarity that rejects vectors of different dimension.
///
/// # Errors
///
/// Returns [`EmbeddingError::DimensionMismatch`] when the lengths differ.
pub fn checked_cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(cosine_similarity(a, b))
}
