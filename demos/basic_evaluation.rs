//! Basic evaluation example: threshold raw model outputs, write a results
//! file and score it against ground truth.

use coco_map_eval::boxes::model_box_to_coco;
use coco_map_eval::evaluator::CocoEvaluator;
use coco_map_eval::results::{results_path, write_results};
use coco_map_eval::threshold::{select_by_score, ScorePolicy};
use coco_map_eval::{load_from_string, Coco, Detection, LabelMap};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== COCO mAP Evaluation Example ===\n");

    // 1. Ground truth
    println!("1. Loading COCO Annotations");
    let ground_truth_json = r#"{
        "images": [
            {"id": 1, "file_name": "image1.jpg", "height": 480, "width": 640}
        ],
        "annotations": [
            {"id": 1, "image_id": 1, "category_id": 1,
             "bbox": [100.0, 100.0, 200.0, 150.0], "area": 30000.0, "iscrowd": 0},
            {"id": 2, "image_id": 1, "category_id": 3,
             "bbox": [350.0, 200.0, 100.0, 120.0], "area": 12000.0, "iscrowd": 0}
        ],
        "categories": [
            {"id": 1, "name": "person", "supercategory": "human"},
            {"id": 3, "name": "car", "supercategory": "vehicle"}
        ]
    }"#;
    let coco_gt = Coco::new(load_from_string(ground_truth_json)?);
    let labels = LabelMap::from_coco(&coco_gt);
    println!("   Loaded {} ground truth annotations", coco_gt.annotations().len());
    println!();

    // 2. Raw outputs as a detector would return them for a 640x480 image
    //    resized to 512 (scale 0.8), sorted by score.
    println!("2. Thresholding Model Outputs");
    let scale = 0.8;
    let scores = [0.95_f32, 0.87, 0.42, 0.03, 0.30];
    let model_labels = [0_i64, 1, 0, 1, 0];
    let boxes = [
        [84.0_f32, 78.4, 240.0, 202.4],
        [278.4, 158.4, 362.4, 258.4],
        [40.0, 40.0, 104.0, 112.0],
        [0.0, 0.0, 10.0, 10.0],
        [200.0, 300.0, 260.0, 340.0],
    ];

    for policy in [ScorePolicy::StopBelow, ScorePolicy::Filter] {
        let kept = select_by_score(&scores, 0.05, policy);
        println!("   {:?}: keeps {} of {} boxes", policy, kept.len(), scores.len());
    }

    let mut detections = Vec::new();
    for i in select_by_score(&scores, 0.05, ScorePolicy::StopBelow) {
        detections.push(Detection {
            image_id: 1,
            category_id: labels.label_to_coco_label(model_labels[i])?,
            score: f64::from(scores[i]),
            bbox: model_box_to_coco(boxes[i], scale),
        });
    }
    println!();

    // 3. Results file
    println!("3. Writing Results");
    let path = results_path(std::env::temp_dir(), "demo");
    write_results(&path, &detections)?;
    println!("   Wrote {} detections to {}", detections.len(), path.display());
    println!();

    // 4. Evaluation
    println!("4. Running COCO Evaluation");
    let coco_dt = coco_gt.load_res(&path)?;
    let mut evaluator = CocoEvaluator::new(&coco_gt, &coco_dt);
    evaluator.evaluate()?;
    evaluator.accumulate()?;
    let metrics = evaluator.summarize()?.clone();
    println!();

    println!("   Per-Class AP:");
    for (cat_id, ap) in &metrics.ap_per_class {
        let name = labels
            .coco_label_to_label(*cat_id)
            .and_then(|label| labels.label_name(label))
            .unwrap_or("unknown");
        println!("   ├─ {} (id={}): {:.4}", name, cat_id, ap);
    }
    println!();

    println!("=== Example Complete ===");

    Ok(())
}
