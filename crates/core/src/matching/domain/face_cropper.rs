use crate::detection::domain::detected_face::DetectedFace;
use crate::shared::bbox::{BoundingBox, PixelBox};
use crate::shared::frame::Frame;

use super::reference_set::ReferenceSet;
use super::similarity::SimilarityError;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.4;
pub const DEFAULT_MIN_FACE_SIZE: u32 = 64;
pub const DEFAULT_PADDING: f64 = 0.3;

/// Mask value marking the detected face inside a crop.
pub const MASK_ON: u8 = 255;

/// Per-call gates and crop geometry for [`filter_and_crop`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchParams {
    /// Minimum best-reference cosine similarity; inclusive.
    pub threshold: f64,
    /// Minimum face width and height in pixels; inclusive.
    pub min_size: u32,
    /// Fraction of face width/height added on each side of the crop.
    pub padding: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_size: DEFAULT_MIN_FACE_SIZE,
            padding: DEFAULT_PADDING,
        }
    }
}

/// A detected face that matched the reference set, cut out of its frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchedFace {
    /// Padded RGB crop.
    pub crop: Frame,
    /// Single-channel mask, same size as `crop`, [`MASK_ON`] over the face.
    pub mask: Frame,
    pub bbox: BoundingBox,
    pub padded_bbox: PixelBox,
    pub similarity: f64,
}

/// Keeps the faces that match a reference and are large enough, and cuts a
/// padded crop and face mask for each.
///
/// Faces are checked in detector order and returned in that order. The crop
/// comes from `image` as given, so it keeps the caller's channel order.
pub fn filter_and_crop(
    image: &Frame,
    faces: &[DetectedFace],
    references: &ReferenceSet,
    params: &MatchParams,
) -> Result<Vec<MatchedFace>, SimilarityError> {
    let mut matched = Vec::new();

    for face in faces {
        let similarity = references.max_similarity(&face.embedding)?;
        if similarity < params.threshold {
            log::debug!(
                "Frame {}: face rejected, similarity {similarity:.3} < {:.3}",
                image.index(),
                params.threshold
            );
            continue;
        }

        let min_size = params.min_size as f64;
        if face.bbox.width() < min_size || face.bbox.height() < min_size {
            log::debug!(
                "Frame {}: face rejected, {:.0}x{:.0} below {}px",
                image.index(),
                face.bbox.width(),
                face.bbox.height(),
                params.min_size
            );
            continue;
        }

        let face_box = face.bbox.to_pixel_box(image.width(), image.height());
        if face_box.is_empty() {
            log::debug!("Frame {}: face lies outside the image", image.index());
            continue;
        }
        let padded = padded_box(&face.bbox, &face_box, params.padding, image);

        matched.push(MatchedFace {
            crop: image.crop(&padded),
            mask: face_mask(&face_box, &padded, image.index()),
            bbox: face.bbox,
            padded_bbox: padded,
            similarity,
        });
    }

    Ok(matched)
}

/// Pads `face_box` by `padding` × the bbox size on every side, clamped to
/// the image. Pad amounts are truncated to whole pixels.
fn padded_box(bbox: &BoundingBox, face_box: &PixelBox, padding: f64, image: &Frame) -> PixelBox {
    let pad_w = (bbox.width() * padding).trunc().max(0.0) as u32;
    let pad_h = (bbox.height() * padding).trunc().max(0.0) as u32;
    face_box.expand(pad_w, pad_h, image.width(), image.height())
}

/// Mask over `crop_box` with the face region switched on.
fn face_mask(face_box: &PixelBox, crop_box: &PixelBox, index: usize) -> Frame {
    let mut mask = Frame::zeros(crop_box.width(), crop_box.height(), 1).with_index(index);
    let inner = face_box.relative_to(crop_box);
    let stride = crop_box.width() as usize;
    let data = mask.data_mut();
    for row in inner.y1 as usize..inner.y2 as usize {
        data[row * stride + inner.x1 as usize..row * stride + inner.x2 as usize].fill(MASK_ON);
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const REF: [f32; 2] = [1.0, 0.0];

    fn references() -> ReferenceSet {
        ReferenceSet::from_embeddings(vec![REF.to_vec()]).unwrap()
    }

    /// Unit embedding whose cosine with `REF` is exactly `similarity`.
    fn embedding_with_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).max(0.0).sqrt()]
    }

    fn face(x1: f64, y1: f64, x2: f64, y2: f64, similarity: f32) -> DetectedFace {
        DetectedFace::new(
            BoundingBox::new(x1, y1, x2, y2),
            embedding_with_similarity(similarity),
            0.9,
        )
    }

    fn image(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 9]);
            }
        }
        Frame::new(data, width, height, 3, 3)
    }

    fn params(threshold: f64, min_size: u32, padding: f64) -> MatchParams {
        MatchParams {
            threshold,
            min_size,
            padding,
        }
    }

    #[test]
    fn test_defaults() {
        let p = MatchParams::default();
        assert_eq!(p.threshold, 0.4);
        assert_eq!(p.min_size, 64);
        assert_eq!(p.padding, 0.3);
    }

    /// The exact similarity the engine computes for a test face.
    fn cosine_of(similarity: f32) -> f64 {
        references()
            .max_similarity(&embedding_with_similarity(similarity))
            .unwrap()
    }

    #[rstest]
    #[case::above(0.9, 1)]
    #[case::at_threshold(0.5, 1)]
    #[case::below(0.49, 0)]
    fn test_similarity_gate_is_inclusive(#[case] similarity: f32, #[case] expected: usize) {
        let faces = vec![face(10.0, 10.0, 80.0, 80.0, similarity)];
        let threshold = cosine_of(0.5);
        let result = filter_and_crop(
            &image(200, 200),
            &faces,
            &references(),
            &params(threshold, 32, 0.0),
        )
        .unwrap();
        assert_eq!(result.len(), expected);
    }

    #[rstest]
    #[case::equal(64.0, 64.0, 1)]
    #[case::narrow(63.0, 64.0, 0)]
    #[case::short(64.0, 63.0, 0)]
    #[case::large(120.0, 100.0, 1)]
    fn test_size_gate_is_inclusive(#[case] w: f64, #[case] h: f64, #[case] expected: usize) {
        let faces = vec![face(10.0, 10.0, 10.0 + w, 10.0 + h, 1.0)];
        let result =
            filter_and_crop(&image(300, 300), &faces, &references(), &params(0.4, 64, 0.3))
                .unwrap();
        assert_eq!(result.len(), expected);
    }

    #[test]
    fn test_padding_expands_each_side() {
        // 100x80 face, padding 0.3 → pad 30 x 24
        let faces = vec![face(100.0, 100.0, 200.0, 180.0, 1.0)];
        let result =
            filter_and_crop(&image(400, 400), &faces, &references(), &params(0.4, 64, 0.3))
                .unwrap();
        let m = &result[0];
        assert_eq!(m.padded_bbox, PixelBox::new(70, 76, 230, 204));
        assert_eq!(m.crop.width(), 160);
        assert_eq!(m.crop.height(), 128);
        assert_eq!(m.mask.width(), 160);
        assert_eq!(m.mask.height(), 128);
        assert_eq!(m.mask.channels(), 1);
        assert_eq!(m.crop.index(), 3);
    }

    #[test]
    fn test_padding_truncates_fractional_pixels() {
        // 70x70 face, padding 0.25 → 17.5 truncated to 17
        let faces = vec![face(100.0, 100.0, 170.0, 170.0, 1.0)];
        let result =
            filter_and_crop(&image(400, 400), &faces, &references(), &params(0.4, 64, 0.25))
                .unwrap();
        assert_eq!(result[0].padded_bbox, PixelBox::new(83, 83, 187, 187));
    }

    #[test]
    fn test_padded_box_clamped_and_superset() {
        let faces = vec![face(5.0, 150.0, 95.0, 198.0, 1.0)];
        let result =
            filter_and_crop(&image(100, 200), &faces, &references(), &params(0.4, 32, 0.5))
                .unwrap();
        let m = &result[0];
        let unpadded = m.bbox.to_pixel_box(100, 200);
        assert!(m.padded_bbox.contains(&unpadded));
        assert!(m.padded_bbox.x2 <= 100);
        assert!(m.padded_bbox.y2 <= 200);
        assert_eq!(m.padded_bbox.x1, 0);
    }

    #[test]
    fn test_crop_pixels_come_from_padded_region() {
        let faces = vec![face(100.0, 50.0, 180.0, 130.0, 1.0)];
        let result =
            filter_and_crop(&image(250, 250), &faces, &references(), &params(0.4, 64, 0.1))
                .unwrap();
        let m = &result[0];
        let arr = m.crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]] as u32, m.padded_bbox.x1);
        assert_eq!(arr[[0, 0, 1]] as u32, m.padded_bbox.y1);
        assert_eq!(arr[[0, 0, 2]], 9);
    }

    #[test]
    fn test_mask_marks_exactly_the_unpadded_bbox() {
        let faces = vec![face(40.0, 60.0, 140.0, 150.0, 1.0)];
        let result =
            filter_and_crop(&image(300, 300), &faces, &references(), &params(0.4, 64, 0.3))
                .unwrap();
        let m = &result[0];
        let unpadded = m.bbox.to_pixel_box(300, 300);
        let mask = m.mask.as_ndarray();
        for row in 0..m.mask.height() {
            for col in 0..m.mask.width() {
                let x = m.padded_bbox.x1 + col;
                let y = m.padded_bbox.y1 + row;
                let inside = x >= unpadded.x1 && x < unpadded.x2 && y >= unpadded.y1 && y < unpadded.y2;
                let expected = if inside { MASK_ON } else { 0 };
                assert_eq!(mask[[row as usize, col as usize, 0]], expected, "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_zero_padding_mask_is_full() {
        let faces = vec![face(10.0, 10.0, 80.0, 80.0, 1.0)];
        let result =
            filter_and_crop(&image(100, 100), &faces, &references(), &params(0.4, 64, 0.0))
                .unwrap();
        assert!(result[0].mask.data().iter().all(|&v| v == MASK_ON));
    }

    #[test]
    fn test_keeps_detector_order_without_dedup() {
        let faces = vec![
            face(200.0, 0.0, 300.0, 100.0, 0.8),
            face(0.0, 0.0, 100.0, 100.0, 0.95),
            face(0.0, 0.0, 100.0, 100.0, 0.1),
            face(0.0, 0.0, 100.0, 100.0, 0.95),
        ];
        let result =
            filter_and_crop(&image(400, 200), &faces, &references(), &params(0.4, 64, 0.0))
                .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].bbox.x1, 200.0);
        assert!(result[1].similarity > result[0].similarity);
    }

    #[test]
    fn test_face_outside_image_is_dropped() {
        let faces = vec![face(500.0, 500.0, 600.0, 600.0, 1.0)];
        let result =
            filter_and_crop(&image(100, 100), &faces, &references(), &params(0.4, 64, 0.3))
                .unwrap();
        assert!(result.is_empty());
    }

    #[rstest]
    #[case::below(10.0, 150.0, 90.0, 250.0)]
    #[case::right(120.0, 10.0, 220.0, 90.0)]
    #[case::above_left(-200.0, -200.0, -100.0, -100.0)]
    fn test_face_clamped_to_nothing_is_dropped_despite_padding(
        #[case] x1: f64,
        #[case] y1: f64,
        #[case] x2: f64,
        #[case] y2: f64,
    ) {
        let faces = vec![face(x1, y1, x2, y2, 1.0)];
        let result =
            filter_and_crop(&image(100, 100), &faces, &references(), &params(0.4, 64, 1.0))
                .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let faces = vec![DetectedFace::new(
            BoundingBox::new(0.0, 0.0, 80.0, 80.0),
            vec![1.0, 0.0, 0.0],
            0.9,
        )];
        let result = filter_and_crop(&image(100, 100), &faces, &references(), &MatchParams::default());
        assert!(matches!(
            result,
            Err(SimilarityError::DimensionMismatch { .. })
        ));
    }
}
