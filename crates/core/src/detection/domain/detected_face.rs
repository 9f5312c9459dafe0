use crate::shared::bbox::BoundingBox;

/// Identity embedding produced by the analyzer for one face.
pub type Embedding = Vec<f32>;

/// One face reported by a [`FaceAnalyzer`](super::face_analyzer::FaceAnalyzer)
/// for one image. Lives only for the frame it was detected in.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
    pub confidence: f64,
}

impl DetectedFace {
    pub fn new(bbox: BoundingBox, embedding: Embedding, confidence: f64) -> Self {
        Self {
            bbox,
            embedding,
            confidence,
        }
    }

    pub fn area(&self) -> f64 {
        self.bbox.area()
    }
}

/// Picks the face with the largest bounding-box area.
///
/// Ties go to the earliest face in detector order.
pub fn largest_face(faces: &[DetectedFace]) -> Option<&DetectedFace> {
    faces.iter().fold(None, |best: Option<&DetectedFace>, face| match best {
        Some(b) if b.area() >= face.area() => Some(b),
        _ => Some(face),
    })
}
