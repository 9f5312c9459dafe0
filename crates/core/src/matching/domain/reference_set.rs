use thiserror::Error;

use crate::detection::domain::detected_face::{largest_face, Embedding};
use crate::detection::domain::face_analyzer::{analyze_rgb, FaceAnalyzer};
use crate::shared::frame::Frame;

use super::similarity::{max_similarity, SimilarityError};

#[derive(Error, Debug)]
pub enum ReferenceSetError {
    #[error("no faces detected in any reference image")]
    NoReferenceFaces,
}

/// Identity embeddings of the reference faces, one per usable reference
/// image, in input order. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceSet {
    embeddings: Vec<Embedding>,
}

impl ReferenceSet {
    /// Runs the analyzer over each reference image and keeps one embedding
    /// per image.
    ///
    /// Images with no detectable face, or on which the analyzer fails, are
    /// skipped with a warning. When an image holds several faces the largest
    /// one is taken as the reference.
    pub fn build(
        images: &[Frame],
        analyzer: &mut dyn FaceAnalyzer,
    ) -> Result<Self, ReferenceSetError> {
        let mut embeddings = Vec::with_capacity(images.len());

        for (i, image) in images.iter().enumerate() {
            let faces = match analyze_rgb(analyzer, image) {
                Ok(faces) => faces,
                Err(e) => {
                    log::warn!("Reference image {i}: face analysis failed ({e}), skipping");
                    continue;
                }
            };
            if faces.len() > 1 {
                log::info!(
                    "Reference image {i}: found {} faces, using largest",
                    faces.len()
                );
            }
            match largest_face(&faces) {
                Some(face) => embeddings.push(face.embedding.clone()),
                None => log::warn!("Reference image {i}: no face detected, skipping"),
            }
        }

        log::info!(
            "Built reference set from {}/{} image(s)",
            embeddings.len(),
            images.len()
        );
        Self::from_embeddings(embeddings)
    }

    /// Wraps embeddings that were computed elsewhere.
    pub fn from_embeddings(embeddings: Vec<Embedding>) -> Result<Self, ReferenceSetError> {
        if embeddings.is_empty() {
            return Err(ReferenceSetError::NoReferenceFaces);
        }
        Ok(Self { embeddings })
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    /// Best cosine similarity between `target` and any reference.
    pub fn max_similarity(&self, target: &[f32]) -> Result<f64, SimilarityError> {
        max_similarity(target, &self.embeddings)
    }
}
