//! Per-image matching of detections to ground truth.
//!
//! For one (image, category) pair and one area range, detections are matched
//! greedily in score order against ground truth at every IoU threshold.
//! Ground truth outside the area range or marked as crowd is "ignored": a
//! detection matched to it counts neither as a true nor a false positive.

use crate::error::Result;
use crate::metrics::iou::calculate_iou_matrix;
use crate::types::{Annotation, BoundingBox};
use std::cmp::Ordering;

/// Matching result for one (image, category, area range).
///
/// Per-threshold vectors are indexed `[iou_threshold][detection]` or
/// `[iou_threshold][ground_truth]`. Detections are in descending score order
/// and ground truth has non-ignored entries first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEvaluation {
    pub image_id: u64,
    pub category_id: Option<u64>,
    pub area_range: [f64; 2],
    pub max_det: usize,
    pub dt_ids: Vec<u64>,
    pub gt_ids: Vec<u64>,
    /// Id of the ground truth each detection matched, if any.
    pub dt_matches: Vec<Vec<Option<u64>>>,
    /// Id of the detection each ground truth matched, if any.
    pub gt_matches: Vec<Vec<Option<u64>>>,
    pub dt_scores: Vec<f64>,
    pub gt_ignore: Vec<bool>,
    pub dt_ignore: Vec<Vec<bool>>,
}

/// Sort detections by descending score, keeping input order among ties,
/// and keep at most `max_det`.
pub fn sort_detections<'a>(detections: &[&'a Annotation], max_det: usize) -> Vec<&'a Annotation> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| {
        b.confidence()
            .partial_cmp(&a.confidence())
            .unwrap_or(Ordering::Equal)
    });
    sorted.truncate(max_det);
    sorted
}

/// IoU matrix `[detection][ground_truth]` for score-sorted detections.
pub fn compute_ious(detections: &[&Annotation], ground_truths: &[&Annotation]) -> Result<Vec<Vec<f64>>> {
    let dt_boxes: Vec<BoundingBox> = detections
        .iter()
        .map(|ann| ann.to_bbox())
        .collect::<Result<Vec<_>>>()?;
    let gt_boxes: Vec<BoundingBox> = ground_truths
        .iter()
        .map(|ann| ann.to_bbox())
        .collect::<Result<Vec<_>>>()?;
    let crowd: Vec<bool> = ground_truths.iter().map(|ann| ann.is_crowd()).collect();

    Ok(calculate_iou_matrix(&dt_boxes, &gt_boxes, &crowd))
}

fn outside(area: f64, range: [f64; 2]) -> bool {
    area < range[0] || area > range[1]
}

/// Match detections to ground truth for a single image and category.
///
/// `detections` must already be score-sorted (see [`sort_detections`]) and
/// `ious` must be [`compute_ious`] of those detections against
/// `ground_truths` in their original order. Returns `None` when the image has
/// neither ground truth nor detections for this category.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_image(
    image_id: u64,
    category_id: Option<u64>,
    ground_truths: &[&Annotation],
    detections: &[&Annotation],
    ious: &[Vec<f64>],
    iou_thresholds: &[f64],
    area_range: [f64; 2],
    max_det: usize,
) -> Option<ImageEvaluation> {
    if ground_truths.is_empty() && detections.is_empty() {
        return None;
    }

    let ignore_flags: Vec<bool> = ground_truths
        .iter()
        .map(|gt| gt.is_crowd() || outside(gt.effective_area(), area_range))
        .collect();

    // Non-ignored ground truth first, stable within each group.
    let mut gt_order: Vec<usize> = (0..ground_truths.len()).collect();
    gt_order.sort_by_key(|&g| ignore_flags[g]);

    let gts: Vec<&Annotation> = gt_order.iter().map(|&g| ground_truths[g]).collect();
    let gt_ignore: Vec<bool> = gt_order.iter().map(|&g| ignore_flags[g]).collect();
    let gt_crowd: Vec<bool> = gts.iter().map(|gt| gt.is_crowd()).collect();

    let num_dt = detections.len().min(max_det);
    let dts = &detections[..num_dt];

    let num_thr = iou_thresholds.len();
    let mut dt_matches = vec![vec![None; num_dt]; num_thr];
    let mut gt_matches = vec![vec![None; gts.len()]; num_thr];
    let mut dt_ignore = vec![vec![false; num_dt]; num_thr];

    for (t, &threshold) in iou_thresholds.iter().enumerate() {
        for (d, dt) in dts.iter().enumerate() {
            let mut best_iou = threshold.min(1.0 - 1e-10);
            let mut best: Option<usize> = None;

            for (g, &orig) in gt_order.iter().enumerate() {
                // Crowd regions can absorb any number of detections.
                if gt_matches[t][g].is_some() && !gt_crowd[g] {
                    continue;
                }
                // Ground truth is ordered, so once a real match exists we
                // never trade it for an ignored one.
                if let Some(m) = best {
                    if !gt_ignore[m] && gt_ignore[g] {
                        break;
                    }
                }
                let iou = ious[d][orig];
                if iou < best_iou {
                    continue;
                }
                best_iou = iou;
                best = Some(g);
            }

            if let Some(m) = best {
                dt_ignore[t][d] = gt_ignore[m];
                dt_matches[t][d] = Some(gts[m].id);
                gt_matches[t][m] = Some(dt.id);
            }
        }
    }

    // Unmatched detections outside the area range do not count.
    for t in 0..num_thr {
        for (d, dt) in dts.iter().enumerate() {
            if dt_matches[t][d].is_none() && outside(dt.effective_area(), area_range) {
                dt_ignore[t][d] = true;
            }
        }
    }

    Some(ImageEvaluation {
        image_id,
        category_id,
        area_range,
        max_det,
        dt_ids: dts.iter().map(|dt| dt.id).collect(),
        gt_ids: gts.iter().map(|gt| gt.id).collect(),
        dt_matches,
        gt_matches,
        dt_scores: dts.iter().map(|dt| dt.confidence()).collect(),
        gt_ignore,
        dt_ignore,
    })
}
