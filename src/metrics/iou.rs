//! Intersection over Union (IoU) calculation.

use crate::types::BoundingBox;

/// Calculate the Intersection over Union (IoU) between two bounding boxes.
///
/// IoU is defined as the area of intersection divided by the area of union.
///
/// # Example
///
/// ```
/// use coco_map_eval::metrics::iou::calculate_iou;
/// use coco_map_eval::types::BoundingBox;
///
/// let bbox1 = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// let bbox2 = BoundingBox::new(5.0, 5.0, 10.0, 10.0);
/// let iou = calculate_iou(&bbox1, &bbox2);
/// assert!(iou > 0.0 && iou < 1.0);
/// ```
pub fn calculate_iou(bbox1: &BoundingBox, bbox2: &BoundingBox) -> f64 {
    calculate_iou_crowd(bbox1, bbox2, false)
}

/// IoU between a detection and a ground truth that may be a crowd region.
///
/// For crowd ground truth the union is the detection's own area, so a
/// detection lying fully inside a crowd scores 1.0.
pub fn calculate_iou_crowd(detection: &BoundingBox, ground_truth: &BoundingBox, is_crowd: bool) -> f64 {
    let x_left = detection.x.max(ground_truth.x);
    let y_top = detection.y.max(ground_truth.y);
    let x_right = detection.right().min(ground_truth.right());
    let y_bottom = detection.bottom().min(ground_truth.bottom());

    if x_right <= x_left || y_bottom <= y_top {
        return 0.0;
    }

    let intersection_area = (x_right - x_left) * (y_bottom - y_top);

    let union_area = if is_crowd {
        detection.area()
    } else {
        detection.area() + ground_truth.area() - intersection_area
    };

    if union_area <= 0.0 {
        return 0.0;
    }

    intersection_area / union_area
}

/// IoU matrix between detections and ground truths.
///
/// `result[d][g]` is the IoU between `detections[d]` and `ground_truths[g]`;
/// `crowd[g]` marks crowd ground truths.
///
/// # Example
///
/// ```
/// use coco_map_eval::metrics::iou::calculate_iou_matrix;
/// use coco_map_eval::types::BoundingBox;
///
/// let dts = vec![BoundingBox::new(0.0, 0.0, 10.0, 10.0)];
/// let gts = vec![BoundingBox::new(5.0, 5.0, 10.0, 10.0)];
/// let iou_matrix = calculate_iou_matrix(&dts, &gts, &[false]);
/// assert_eq!(iou_matrix.len(), 1);
/// assert_eq!(iou_matrix[0].len(), 1);
/// ```
pub fn calculate_iou_matrix(
    detections: &[BoundingBox],
    ground_truths: &[BoundingBox],
    crowd: &[bool],
) -> Vec<Vec<f64>> {
    detections
        .iter()
        .map(|dt| {
            ground_truths
                .iter()
                .zip(crowd.iter())
                .map(|(gt, &is_crowd)| calculate_iou_crowd(dt, gt, is_crowd))
                .collect()
        })
        .collect()
}
