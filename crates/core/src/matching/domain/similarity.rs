use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("embedding dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("no reference embeddings to compare against")]
    EmptyReferenceSet,
}

/// Cosine similarity of two embeddings, in `[-1, 1]`.
///
/// A zero-norm vector has similarity 0.0 with everything.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        Ok(dot / denom)
    } else {
        Ok(0.0)
    }
}

/// Best cosine similarity between `target` and any of `references`.
pub fn max_similarity<R: AsRef<[f32]>>(
    target: &[f32],
    references: &[R],
) -> Result<f64, SimilarityError> {
    let mut best: Option<f64> = None;
    for reference in references {
        let sim = cosine(reference.as_ref(), target)?;
        best = Some(best.map_or(sim, |b| b.max(sim)));
    }
    best.ok_or(SimilarityError::EmptyReferenceSet)
}
