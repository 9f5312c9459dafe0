//! Box geometry shared by the detection backends.

use crate::shared::bbox::BoundingBox;

/// Intersection over union of two bounding boxes.
pub fn bbox_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    inter / (a.area() + b.area() - inter)
}

/// Greedy non-maximum suppression over `(bbox, score)` pairs.
///
/// Returns the indices of kept entries, highest score first. An entry is
/// dropped when its IoU with an already-kept entry exceeds `iou_thresh`.
pub fn non_max_suppression(boxes: &[(BoundingBox, f64)], iou_thresh: f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        boxes[b]
            .1
            .partial_cmp(&boxes[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    for i in order {
        let overlaps = keep
            .iter()
            .any(|&k| bbox_iou(&boxes[k].0, &boxes[i].0) > iou_thresh);
        if !overlaps {
            keep.push(i);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bb(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[test]
    fn test_bbox_iou_no_overlap() {
        assert_eq!(bbox_iou(&bb(0.0, 0.0, 10.0, 10.0), &bb(20.0, 20.0, 30.0, 30.0)), 0.0);
    }

    #[test]
    fn test_bbox_iou_perfect_overlap() {
        let a = bb(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(bbox_iou(&a, &a), 1.0);
    }

    #[test]
    fn test_bbox_iou_partial_overlap() {
        let a = bb(0.0, 0.0, 10.0, 10.0);
        let b = bb(5.0, 5.0, 15.0, 15.0);
        assert_relative_eq!(bbox_iou(&a, &b), 25.0 / 175.0);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let boxes = vec![
            (bb(0.0, 0.0, 100.0, 100.0), 0.8),
            (bb(5.0, 5.0, 105.0, 105.0), 0.9),
        ];
        assert_eq!(non_max_suppression(&boxes, 0.45), vec![1]);
    }

    #[test]
    fn test_nms_keeps_non_overlapping_in_score_order() {
        let boxes = vec![
            (bb(0.0, 0.0, 50.0, 50.0), 0.6),
            (bb(200.0, 200.0, 250.0, 250.0), 0.9),
        ];
        assert_eq!(non_max_suppression(&boxes, 0.45), vec![1, 0]);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(non_max_suppression(&[], 0.45).is_empty());
    }
}
