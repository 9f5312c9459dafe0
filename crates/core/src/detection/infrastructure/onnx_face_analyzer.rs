//! Face analyzer built from two ONNX Runtime sessions: a YOLO face detector
//! and an ArcFace embedder.
//!
//! Detection letterboxes the whole frame, decodes and NMS-filters the boxes;
//! each surviving box is cropped, resized to the ArcFace input and embedded.
//! No landmark alignment is done before embedding.

use std::path::Path;

use crate::detection::domain::detected_face::{DetectedFace, Embedding};
use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::shared::bbox::BoundingBox;
use crate::shared::device::Device;
use crate::shared::frame::Frame;

use super::execution_provider::execution_providers;
use super::math::non_max_suppression;

/// Fallback detector input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

const EMBED_INPUT_SIZE: usize = 112;
const EMBED_NORM_MEAN: f32 = 127.5;
const EMBED_NORM_STD: f32 = 127.5;

pub struct OnnxFaceAnalyzer {
    detector: ort::session::Session,
    embedder: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxFaceAnalyzer {
    /// Loads both models on the requested device.
    ///
    /// The detector input resolution is read from the model's NCHW input
    /// shape, falling back to 640 when the shape is dynamic.
    pub fn new(
        detector_model: &Path,
        embedder_model: &Path,
        device: Device,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let detector = ort::session::Session::builder()?
            .with_execution_providers(execution_providers(device))?
            .commit_from_file(detector_model)?;

        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let embedder = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(execution_providers(device))?
            .commit_from_file(embedder_model)?;

        let input_size = detector
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!("Face analyzer ready on {device} (detector input {input_size}px)");

        Ok(Self {
            detector,
            embedder,
            confidence,
            input_size,
        })
    }

    fn detect_boxes(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<(BoundingBox, f64)>, Box<dyn std::error::Error>> {
        let confidence = self.confidence;
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.detector.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Face detector produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected detector output shape: {shape:?}").into());
        }

        // Output is [1, features, detections] or [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Err(format!("Detector output has too few features: {num_feats}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get detector output slice")?;
        let feature = |det: usize, f: usize| {
            if transposed {
                data[f * num_dets + det]
            } else {
                data[det * num_feats + f]
            }
        };

        let mut boxes = Vec::new();
        for i in 0..num_dets {
            let score = feature(i, 4) as f64;
            if score < confidence {
                continue;
            }
            let cx = feature(i, 0) as f64;
            let cy = feature(i, 1) as f64;
            let w = feature(i, 2) as f64;
            let h = feature(i, 3) as f64;

            // Letterbox coordinates back to frame coordinates.
            let bbox = BoundingBox::new(
                ((cx - w / 2.0) - pad_x as f64) / scale,
                ((cy - h / 2.0) - pad_y as f64) / scale,
                ((cx + w / 2.0) - pad_x as f64) / scale,
                ((cy + h / 2.0) - pad_y as f64) / scale,
            );
            boxes.push((bbox, score));
        }

        let kept = non_max_suppression(&boxes, NMS_IOU_THRESH);
        Ok(kept.into_iter().map(|i| boxes[i]).collect())
    }

    fn embed(&mut self, face_crop: &Frame) -> Result<Embedding, Box<dyn std::error::Error>> {
        let tensor = preprocess_face(face_crop);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.embedder.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let mut embedding = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?
            .to_vec();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        let boxes = self.detect_boxes(frame)?;

        let mut faces = Vec::with_capacity(boxes.len());
        for (bbox, score) in boxes {
            let pixel_box = bbox.to_pixel_box(frame.width(), frame.height());
            if pixel_box.is_empty() {
                log::debug!("Dropping detection outside frame {}: {bbox:?}", frame.index());
                continue;
            }
            let embedding = self.embed(&frame.crop(&pixel_box))?;
            faces.push(DetectedFace::new(bbox, embedding, score));
        }
        Ok(faces)
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Resize a face crop to 112x112, normalize to [-1, 1], NCHW layout.
fn preprocess_face(crop: &Frame) -> ndarray::Array4<f32> {
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;
    let src = crop.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, EMBED_INPUT_SIZE, EMBED_INPUT_SIZE));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..EMBED_INPUT_SIZE {
        let src_y =
            (((y as f64 + 0.5) * src_h as f64 / EMBED_INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..EMBED_INPUT_SIZE {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / EMBED_INPUT_SIZE as f64) as usize)
                .min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] =
                    (src[[src_y, src_x, c]] as f32 - EMBED_NORM_MEAN) / EMBED_NORM_STD;
            }
        }
    }

    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height, 3, 0)
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → scale 3.2, new 640x320, pad_y 160
        let (tensor, scale, pad_x, pad_y) = letterbox(&solid(200, 100, 128), 640);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let (tensor, _, pad_x, pad_y) = letterbox(&solid(100, 50, 255), 640);
        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert!((tensor[[0, 0, y, x]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_face_shape_and_range() {
        let tensor = preprocess_face(&solid(37, 51, 255));
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        assert!((tensor[[0, 2, 111, 111]] - 1.0).abs() < 0.01);

        let tensor = preprocess_face(&solid(10, 10, 0));
        assert!((tensor[[0, 0, 0, 0]] + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_face_keeps_channel_order() {
        let crop = Frame::new([255u8, 0, 0].repeat(4), 2, 2, 3, 0);
        let tensor = preprocess_face(&crop);
        assert!(tensor[[0, 0, 5, 5]] > 0.9);
        assert!(tensor[[0, 2, 5, 5]] < -0.9);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
