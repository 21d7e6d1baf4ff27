//! Integration tests for the COCO bbox evaluation protocol.

use coco_map_eval::coco::Coco;
use coco_map_eval::evaluator::{evaluate, CocoEvaluator};
use coco_map_eval::types::{Annotation, Category, CocoDataset, Detection, Image};

fn create_annotation(id: u64, image_id: u64, category_id: u64, bbox: Vec<f64>) -> Annotation {
    let area = Some(bbox[2] * bbox[3]);
    Annotation {
        id,
        image_id,
        category_id,
        bbox,
        area,
        iscrowd: Some(0),
        score: None,
    }
}

fn create_crowd(id: u64, image_id: u64, category_id: u64, bbox: Vec<f64>) -> Annotation {
    Annotation {
        iscrowd: Some(1),
        ..create_annotation(id, image_id, category_id, bbox)
    }
}

fn create_category(id: u64, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
        supercategory: None,
    }
}

fn create_image(id: u64) -> Image {
    Image {
        id,
        file_name: format!("{:012}.jpg", id),
        height: 480,
        width: 640,
    }
}

fn ground_truth(annotations: Vec<Annotation>) -> Coco {
    Coco::new(CocoDataset {
        images: Some(vec![create_image(1), create_image(2)]),
        annotations,
        categories: vec![create_category(1, "person"), create_category(2, "car")],
    })
}

fn det(image_id: u64, category_id: u64, score: f64, bbox: [f64; 4]) -> Detection {
    Detection {
        image_id,
        category_id,
        score,
        bbox,
    }
}

#[test]
fn test_perfect_predictions() {
    let gt = ground_truth(vec![
        create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0]),
        create_annotation(2, 1, 2, vec![100.0, 100.0, 120.0, 120.0]),
        create_annotation(3, 2, 1, vec![5.0, 5.0, 20.0, 20.0]),
    ]);
    let dt = gt
        .load_res_from_detections(&[
            det(1, 1, 0.95, [10.0, 10.0, 50.0, 50.0]),
            det(1, 2, 0.90, [100.0, 100.0, 120.0, 120.0]),
            det(2, 1, 0.85, [5.0, 5.0, 20.0, 20.0]),
        ])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();

    assert!((metrics.map - 1.0).abs() < 1e-9, "mAP should be 1.0, got {}", metrics.map);
    assert!((metrics.ap50 - 1.0).abs() < 1e-9);
    assert!((metrics.ap75 - 1.0).abs() < 1e-9);
    assert!((metrics.ap_small - 1.0).abs() < 1e-9);
    assert!((metrics.ap_medium - 1.0).abs() < 1e-9);
    assert!((metrics.ap_large - 1.0).abs() < 1e-9);
    assert!((metrics.ar100 - 1.0).abs() < 1e-9);
    assert_eq!(metrics.ap_per_class.len(), 2);
}

#[test]
fn test_no_predictions() {
    let gt = ground_truth(vec![create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0])]);
    let dt = gt.load_res_from_detections(&[]).unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    assert_eq!(metrics.map, 0.0);
    assert_eq!(metrics.ar100, 0.0);
}

#[test]
fn test_half_recall() {
    let gt = ground_truth(vec![
        create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0]),
        create_annotation(2, 1, 1, vec![200.0, 200.0, 50.0, 50.0]),
    ]);
    let dt = gt
        .load_res_from_detections(&[det(1, 1, 0.9, [10.0, 10.0, 50.0, 50.0])])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    // precision 1 at the 51 recall levels up to 0.50, 0 after
    assert!((metrics.map - 51.0 / 101.0).abs() < 1e-9, "got {}", metrics.map);
    assert!((metrics.ar100 - 0.5).abs() < 1e-9);
}

#[test]
fn test_higher_scoring_false_positive() {
    let gt = ground_truth(vec![create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0])]);
    let dt = gt
        .load_res_from_detections(&[
            det(1, 1, 0.9, [300.0, 300.0, 50.0, 50.0]),
            det(1, 1, 0.8, [10.0, 10.0, 50.0, 50.0]),
        ])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    assert!((metrics.map - 0.5).abs() < 1e-9, "got {}", metrics.map);
    assert!((metrics.ar100 - 1.0).abs() < 1e-9);
}

#[test]
fn test_iou_threshold_sensitivity() {
    let gt = ground_truth(vec![create_annotation(1, 1, 1, vec![0.0, 0.0, 100.0, 100.0])]);
    // IoU = 0.62: matches at 0.50, 0.55 and 0.60 only
    let dt = gt
        .load_res_from_detections(&[det(1, 1, 0.9, [0.0, 0.0, 100.0, 62.0])])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    assert!((metrics.ap50 - 1.0).abs() < 1e-9);
    assert_eq!(metrics.ap75, 0.0);
    assert!((metrics.map - 0.3).abs() < 1e-9, "got {}", metrics.map);
}

#[test]
fn test_crowd_never_counts_as_missed() {
    let gt = ground_truth(vec![
        create_annotation(1, 1, 1, vec![300.0, 300.0, 50.0, 50.0]),
        create_crowd(2, 1, 1, vec![0.0, 0.0, 200.0, 200.0]),
    ]);
    let dt = gt
        .load_res_from_detections(&[det(1, 1, 0.9, [300.0, 300.0, 50.0, 50.0])])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    assert!((metrics.map - 1.0).abs() < 1e-9, "got {}", metrics.map);
}

#[test]
fn test_detections_inside_crowd_are_ignored() {
    let gt = ground_truth(vec![
        create_annotation(1, 1, 1, vec![300.0, 300.0, 50.0, 50.0]),
        create_crowd(2, 1, 1, vec![0.0, 0.0, 200.0, 200.0]),
    ]);
    // Two boxes inside the crowd region outscore the true positive. Both
    // match the crowd and are dropped rather than counted as false positives.
    let dt = gt
        .load_res_from_detections(&[
            det(1, 1, 0.99, [10.0, 10.0, 30.0, 30.0]),
            det(1, 1, 0.98, [50.0, 50.0, 30.0, 30.0]),
            det(1, 1, 0.90, [300.0, 300.0, 50.0, 50.0]),
        ])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    assert!((metrics.map - 1.0).abs() < 1e-9, "got {}", metrics.map);
}

#[test]
fn test_max_dets_limits_recall() {
    let gt = ground_truth(vec![
        create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0]),
        create_annotation(2, 1, 1, vec![200.0, 200.0, 50.0, 50.0]),
    ]);
    let dt = gt
        .load_res_from_detections(&[
            det(1, 1, 0.9, [10.0, 10.0, 50.0, 50.0]),
            det(1, 1, 0.8, [200.0, 200.0, 50.0, 50.0]),
        ])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    assert!((metrics.ar1 - 0.5).abs() < 1e-9);
    assert!((metrics.ar10 - 1.0).abs() < 1e-9);
    assert!((metrics.ar100 - 1.0).abs() < 1e-9);
}

#[test]
fn test_category_mismatch_is_false_positive() {
    let gt = ground_truth(vec![create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0])]);
    let dt = gt
        .load_res_from_detections(&[det(1, 2, 0.9, [10.0, 10.0, 50.0, 50.0])])
        .unwrap();

    let metrics = evaluate(&gt, &dt, None).unwrap();
    // category 2 has no ground truth and stays out of the mean
    assert_eq!(metrics.map, 0.0);
    assert_eq!(metrics.ap_per_class, vec![(1, 0.0), (2, -1.0)]);
}

#[test]
fn test_restricting_to_visited_images() {
    let gt = ground_truth(vec![
        create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0]),
        create_annotation(2, 2, 1, vec![10.0, 10.0, 50.0, 50.0]),
    ]);
    let dt = gt
        .load_res_from_detections(&[det(1, 1, 0.9, [10.0, 10.0, 50.0, 50.0])])
        .unwrap();

    let all = evaluate(&gt, &dt, None).unwrap();
    assert!((all.ar100 - 0.5).abs() < 1e-9);

    let visited = evaluate(&gt, &dt, Some(vec![1])).unwrap();
    assert!((visited.map - 1.0).abs() < 1e-9);
}

#[test]
fn test_summary_has_twelve_lines_in_order() {
    let gt = ground_truth(vec![create_annotation(1, 1, 1, vec![10.0, 10.0, 50.0, 50.0])]);
    let dt = gt
        .load_res_from_detections(&[det(1, 1, 0.9, [10.0, 10.0, 50.0, 50.0])])
        .unwrap();

    let mut evaluator = CocoEvaluator::new(&gt, &dt);
    evaluator.evaluate().unwrap();
    evaluator.accumulate().unwrap();
    let lines = evaluator.summary_lines().unwrap();

    assert_eq!(lines.len(), 12);
    assert!(lines[1].contains("IoU=0.50      |"));
    assert!(lines[2].contains("IoU=0.75      |"));
    assert!(lines[4].contains("area=medium"));
    assert!(lines[5].contains("area= large"));
    assert!(lines[7].contains("maxDets= 10"));
    for line in &lines[..6] {
        assert!(line.starts_with(" Average Precision  (AP) @["));
    }
    for line in &lines[6..] {
        assert!(line.starts_with(" Average Recall     (AR) @["));
    }

    let metrics = evaluator.summarize().unwrap();
    assert!((metrics.map - 1.0).abs() < 1e-9);
    assert!(evaluator.stats().is_some());
}
