//! Precision/recall curves built from score-ordered detections.

/// Cumulative precision and recall after each detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
}

impl PrecisionRecallCurve {
    /// Recall after the last detection, or 0.0 for an empty curve.
    pub fn final_recall(&self) -> f64 {
        self.recall.last().copied().unwrap_or(0.0)
    }
}

/// Build a precision-recall curve from detections sorted by score.
///
/// `true_positive[i]` and `false_positive[i]` describe detection `i`; a
/// detection that is neither (ignored) still adds a point to the curve.
///
/// # Example
///
/// ```
/// use coco_map_eval::metrics::precision_recall::precision_recall_curve;
///
/// let curve = precision_recall_curve(&[true, false, true], &[false, true, false], 4);
/// assert_eq!(curve.recall, vec![0.25, 0.25, 0.5]);
/// ```
pub fn precision_recall_curve(
    true_positive: &[bool],
    false_positive: &[bool],
    num_ground_truth: usize,
) -> PrecisionRecallCurve {
    let mut curve = PrecisionRecallCurve::default();
    let mut tp = 0usize;
    let mut fp = 0usize;

    for (&is_tp, &is_fp) in true_positive.iter().zip(false_positive) {
        tp += usize::from(is_tp);
        fp += usize::from(is_fp);

        let recall = if num_ground_truth > 0 {
            tp as f64 / num_ground_truth as f64
        } else {
            0.0
        };
        let precision = tp as f64 / ((tp + fp) as f64 + f64::EPSILON);

        curve.precision.push(precision);
        curve.recall.push(recall);
    }

    curve
}

/// Replace each precision with the maximum precision at any later point.
pub fn make_monotone(precision: &mut [f64]) {
    for i in (1..precision.len()).rev() {
        if precision[i] > precision[i - 1] {
            precision[i - 1] = precision[i];
        }
    }
}

/// Sample precision at fixed recall levels.
///
/// For each level, takes the precision of the first curve point whose recall
/// reaches it; levels beyond the curve's final recall get 0.0. `precision`
/// should already be monotone.
pub fn interpolate_precision(precision: &[f64], recall: &[f64], recall_levels: &[f64]) -> Vec<f64> {
    recall_levels
        .iter()
        .map(|&level| {
            let idx = recall.partition_point(|&r| r < level);
            precision.get(idx).copied().unwrap_or(0.0)
        })
        .collect()
}

/// The 101 COCO recall levels 0.00, 0.01, ..., 1.00.
pub fn coco_recall_levels() -> Vec<f64> {
    (0..=100).map(|i| i as f64 / 100.0).collect()
}
