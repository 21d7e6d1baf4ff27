//! Property-based tests using proptest
//!
//! These tests verify invariants that should hold regardless of the model
//! outputs, box coordinates or score orderings fed in.

use coco_map_eval::boxes::{model_box_to_coco, xywh_to_xyxy, xyxy_to_xywh};
use coco_map_eval::coco::Coco;
use coco_map_eval::dataset::{EvalDataset, Sample};
use coco_map_eval::error::{EvalError, Result};
use coco_map_eval::inference::collect_detections;
use coco_map_eval::metrics::calculate_iou;
use coco_map_eval::metrics::precision_recall::{
    coco_recall_levels, interpolate_precision, make_monotone,
};
use coco_map_eval::model::{Detector, RawDetections};
use coco_map_eval::threshold::{select_by_score, ScorePolicy};
use coco_map_eval::types::{BoundingBox, Category, CocoDataset, Image};
use ndarray::Array3;
use proptest::prelude::*;

/// Dataset of blank images with fixed ids.
struct BlankDataset {
    coco: Coco,
    ids: Vec<u64>,
}

impl BlankDataset {
    fn new(count: usize) -> Self {
        let ids: Vec<u64> = (1..=count as u64).collect();
        let images = ids
            .iter()
            .map(|&id| Image {
                id,
                file_name: format!("{}.jpg", id),
                height: 64,
                width: 64,
            })
            .collect();
        let coco = Coco::new(CocoDataset {
            images: Some(images),
            annotations: Vec::new(),
            categories: vec![Category {
                id: 1,
                name: "object".to_string(),
                supercategory: None,
            }],
        });
        Self { coco, ids }
    }
}

impl EvalDataset for BlankDataset {
    fn len(&self) -> usize {
        self.ids.len()
    }

    fn sample(&self, index: usize) -> Result<Sample> {
        Ok(Sample {
            image: Array3::zeros((1, 1, 3)),
            scale: 1.0,
            image_id: self.ids[index],
        })
    }

    fn image_ids(&self) -> &[u64] {
        &self.ids
    }

    fn label_to_coco_label(&self, label: i64) -> Result<u64> {
        if label == 0 {
            Ok(1)
        } else {
            Err(EvalError::UnknownLabel(label))
        }
    }

    fn set_name(&self) -> &str {
        "blank"
    }

    fn coco(&self) -> &Coco {
        &self.coco
    }

    fn num_classes(&self) -> usize {
        1
    }
}

/// Returns the same scores for every image.
struct FixedScores(Vec<f32>);

impl Detector for FixedScores {
    fn detect(&mut self, _image: &Array3<f32>) -> Result<RawDetections> {
        Ok(RawDetections {
            scores: self.0.clone(),
            labels: vec![0; self.0.len()],
            boxes: vec![[0.0, 0.0, 1.0, 1.0]; self.0.len()],
        })
    }
}

proptest! {
    #[test]
    fn prop_box_conversion_inverts(
        x in -1000.0f64..1000.0,
        y in -1000.0f64..1000.0,
        w in 0.0f64..1000.0,
        h in 0.0f64..1000.0,
    ) {
        let back = xyxy_to_xywh(xywh_to_xyxy([x, y, w, h]));
        prop_assert!((back[0] - x).abs() < 1e-9);
        prop_assert!((back[1] - y).abs() < 1e-9);
        prop_assert!((back[2] - w).abs() < 1e-9);
        prop_assert!((back[3] - h).abs() < 1e-9);
    }

    #[test]
    fn prop_model_box_unscales(
        x1 in 0.0f32..500.0,
        y1 in 0.0f32..500.0,
        w in 0.0f32..500.0,
        h in 0.0f32..500.0,
        scale in 0.1f64..4.0,
    ) {
        let coco = model_box_to_coco([x1, y1, x1 + w, y1 + h], scale);
        prop_assert!((coco[0] - f64::from(x1) / scale).abs() < 1e-3);
        prop_assert!((coco[1] - f64::from(y1) / scale).abs() < 1e-3);
        prop_assert!((coco[2] - f64::from(x1 + w) / scale + f64::from(x1) / scale).abs() < 1e-3);
        prop_assert!(coco[2] >= -1e-6 && coco[3] >= -1e-6);
    }

    #[test]
    fn prop_stop_below_is_prefix_of_filter(
        scores in prop::collection::vec(0.0f32..1.0, 0..50),
        threshold in 0.0f64..1.0,
    ) {
        let stopped = select_by_score(&scores, threshold, ScorePolicy::StopBelow);
        let filtered = select_by_score(&scores, threshold, ScorePolicy::Filter);

        // indices 0..n, all passing
        prop_assert_eq!(&stopped, &(0..stopped.len()).collect::<Vec<_>>());
        prop_assert!(filtered.starts_with(&stopped));
        for &i in &filtered {
            prop_assert!(f64::from(scores[i]) >= threshold);
        }
        // the box after the kept prefix, if any, is below threshold
        if let Some(&score) = scores.get(stopped.len()) {
            prop_assert!(f64::from(score) < threshold);
        }
    }

    #[test]
    fn prop_sorted_scores_make_policies_agree(
        scores in prop::collection::vec(0.0f32..1.0, 0..50),
        threshold in 0.0f64..1.0,
    ) {
        let mut scores = scores;
        scores.sort_by(|a, b| b.partial_cmp(a).unwrap());
        prop_assert_eq!(
            select_by_score(&scores, threshold, ScorePolicy::StopBelow),
            select_by_score(&scores, threshold, ScorePolicy::Filter)
        );
    }

    #[test]
    fn prop_every_image_is_visited(
        count in 0usize..20,
        scores in prop::collection::vec(0.0f32..1.0, 0..10),
        filter in any::<bool>(),
    ) {
        let dataset = BlankDataset::new(count);
        let mut model = FixedScores(scores.clone());
        let policy = if filter { ScorePolicy::Filter } else { ScorePolicy::StopBelow };

        let collected = collect_detections(&dataset, &mut model, 0.05, policy).unwrap();
        prop_assert_eq!(collected.image_ids.len(), dataset.len());
        prop_assert_eq!(&collected.image_ids[..], dataset.image_ids());

        let per_image = select_by_score(&scores, 0.05, policy).len();
        prop_assert_eq!(collected.results.len(), per_image * count);
        for det in &collected.results {
            prop_assert!(det.score >= 0.05 - 1e-9);
            prop_assert_eq!(det.category_id, 1);
        }
    }

    #[test]
    fn prop_iou_in_unit_range(
        x1 in 0.0f64..100.0, y1 in 0.0f64..100.0, w1 in 0.1f64..100.0, h1 in 0.1f64..100.0,
        x2 in 0.0f64..100.0, y2 in 0.0f64..100.0, w2 in 0.1f64..100.0, h2 in 0.1f64..100.0,
    ) {
        let a = BoundingBox::new(x1, y1, w1, h1);
        let b = BoundingBox::new(x2, y2, w2, h2);
        let iou = calculate_iou(&a, &b);
        prop_assert!((0.0..=1.0 + 1e-12).contains(&iou), "IoU out of range: {}", iou);
        prop_assert!((iou - calculate_iou(&b, &a)).abs() < 1e-12);
        prop_assert!((calculate_iou(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_monotone_precision_never_increases(
        precision in prop::collection::vec(0.0f64..1.0, 1..60),
    ) {
        let mut precision = precision;
        make_monotone(&mut precision);
        for w in precision.windows(2) {
            prop_assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn prop_interpolated_precision_bounded(
        raw in prop::collection::vec((any::<bool>(), 0.0f64..1.0), 1..40),
    ) {
        let mut recall: Vec<f64> = raw.iter().map(|&(_, r)| r).collect();
        recall.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut precision: Vec<f64> = raw.iter().map(|&(hit, _)| if hit { 1.0 } else { 0.5 }).collect();
        make_monotone(&mut precision);

        let q = interpolate_precision(&precision, &recall, &coco_recall_levels());
        prop_assert_eq!(q.len(), 101);
        for w in q.windows(2) {
            prop_assert!(w[0] >= w[1]);
        }
        for &p in &q {
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }
}
