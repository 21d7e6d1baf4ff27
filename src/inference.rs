//! Run a detector over a dataset and collect COCO detections.

use crate::boxes::model_box_to_coco;
use crate::dataset::EvalDataset;
use crate::error::Result;
use crate::model::Detector;
use crate::stats::InferenceStats;
use crate::threshold::{is_descending, select_by_score, ScorePolicy};
use crate::types::Detection;
use std::io::Write;

/// Everything one pass over a dataset produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    /// Detections in visiting order.
    pub results: Vec<Detection>,
    /// Every visited image id, in dataset order.
    pub image_ids: Vec<u64>,
    pub stats: InferenceStats,
}

/// Run `model` on every sample of `dataset`.
///
/// Boxes are mapped back to original image pixels and converted to
/// `[x, y, w, h]`. Scores are thresholded according to `policy`. Every image
/// id is recorded, whether or not it produced detections.
pub fn collect_detections<D, M>(
    dataset: &D,
    model: &mut M,
    threshold: f64,
    policy: ScorePolicy,
) -> Result<Collected>
where
    D: EvalDataset + ?Sized,
    M: Detector + ?Sized,
{
    let total = dataset.len();
    let mut collected = Collected {
        image_ids: Vec::with_capacity(total),
        ..Collected::default()
    };
    let mut warned_unsorted = false;
    let mut warned_non_finite = false;

    tracing::info!(
        set = dataset.set_name(),
        images = total,
        threshold,
        ?policy,
        "running inference"
    );

    for index in 0..total {
        let sample = dataset.sample(index)?;
        let scale = sample.scale;
        let raw = model.detect(&sample.image)?;
        collected.stats.record_image(raw.len());

        if !raw.is_empty() {
            if !is_descending(&raw.scores) {
                collected.stats.record_out_of_order();
                if policy == ScorePolicy::StopBelow && !warned_unsorted {
                    tracing::warn!(
                        image_id = sample.image_id,
                        "model scores are not sorted; boxes after the first low score are dropped"
                    );
                    warned_unsorted = true;
                }
            }

            let keep = select_by_score(&raw.scores, threshold, policy);
            let mut non_finite = 0;
            for &i in &keep {
                let score = f64::from(raw.scores[i]);
                let bbox = model_box_to_coco(raw.boxes[i], scale);
                // NaN would be written as `null` and the results file could not be read back.
                if !score.is_finite() || !bbox.iter().all(|v| v.is_finite()) {
                    non_finite += 1;
                    collected.stats.record_non_finite();
                    if !warned_non_finite {
                        tracing::warn!(
                            image_id = sample.image_id,
                            box_index = i,
                            "dropping box with non-finite score or coordinates"
                        );
                        warned_non_finite = true;
                    }
                    continue;
                }
                collected.results.push(Detection {
                    image_id: sample.image_id,
                    category_id: dataset.label_to_coco_label(raw.labels[i])?,
                    score,
                    bbox,
                });
            }
            let emitted = keep.len() - non_finite;
            collected.stats.record_kept(emitted, raw.len() - non_finite);
            tracing::debug!(
                image_id = sample.image_id,
                returned = raw.len(),
                kept = emitted,
                "processed image"
            );
        }

        collected.image_ids.push(sample.image_id);

        eprint!("{}\r", progress_line(index, total));
        let _ = std::io::stderr().flush();
    }
    if total > 0 {
        eprintln!();
    }

    tracing::info!("{}", collected.stats.summary_string());
    Ok(collected)
}

/// Console progress counter; `index` is the 0-based position just finished.
pub fn progress_line(index: usize, total: usize) -> String {
    format!("{}/{}", index, total)
}
