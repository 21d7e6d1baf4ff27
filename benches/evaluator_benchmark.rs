use coco_map_eval::coco::Coco;
use coco_map_eval::evaluator::evaluate;
use coco_map_eval::metrics::calculate_iou;
use coco_map_eval::threshold::{select_by_score, ScorePolicy};
use coco_map_eval::types::{Annotation, BoundingBox, Category, CocoDataset, Detection, Image};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_iou_calculation(c: &mut Criterion) {
    let bbox1 = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
    let bbox2 = BoundingBox::new(30.0, 30.0, 50.0, 50.0);

    c.bench_function("iou_single", |b| {
        b.iter(|| calculate_iou(black_box(&bbox1), black_box(&bbox2)));
    });
}

fn bench_select_by_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_by_score");
    let scores: Vec<f32> = (0..1000).map(|i| 1.0 - i as f32 / 1000.0).collect();

    for policy in [ScorePolicy::StopBelow, ScorePolicy::Filter] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", policy)),
            &policy,
            |b, &policy| b.iter(|| select_by_score(black_box(&scores), 0.05, policy)),
        );
    }
    group.finish();
}

/// Ground truth with `num_images` images holding 10 boxes each over 5
/// categories, and detections jittered around them plus one miss per image.
fn synthetic(num_images: u64) -> (Coco, Vec<Detection>) {
    let mut annotations = Vec::new();
    let mut detections = Vec::new();
    for image_id in 1..=num_images {
        for j in 0..10u64 {
            let offset = (j * 40) as f64;
            let bbox = vec![offset, offset, 20.0 + j as f64 * 5.0, 30.0];
            annotations.push(Annotation {
                id: image_id * 100 + j,
                image_id,
                category_id: j % 5 + 1,
                area: Some(bbox[2] * bbox[3]),
                bbox,
                iscrowd: Some(0),
                score: None,
            });
            detections.push(Detection {
                image_id,
                category_id: j % 5 + 1,
                score: 0.5 + (j as f64) * 0.04,
                bbox: [offset + 1.0, offset + 2.0, 20.0 + j as f64 * 5.0, 28.0],
            });
        }
        detections.push(Detection {
            image_id,
            category_id: 1,
            score: 0.95,
            bbox: [500.0, 500.0, 30.0, 30.0],
        });
    }

    let images = (1..=num_images)
        .map(|id| Image {
            id,
            file_name: format!("{:012}.jpg", id),
            height: 640,
            width: 640,
        })
        .collect();
    let categories = (1..=5)
        .map(|id| Category {
            id,
            name: format!("class{}", id),
            supercategory: None,
        })
        .collect();

    let gt = Coco::new(CocoDataset {
        images: Some(images),
        annotations,
        categories,
    });
    (gt, detections)
}

fn bench_full_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_evaluation");
    group.sample_size(10);

    for num_images in [10u64, 100, 500] {
        let (gt, detections) = synthetic(num_images);
        let dt = match gt.load_res_from_detections(&detections) {
            Ok(dt) => dt,
            Err(e) => panic!("synthetic detections rejected: {}", e),
        };

        group.bench_with_input(BenchmarkId::from_parameter(num_images), &num_images, |b, _| {
            b.iter(|| evaluate(black_box(&gt), black_box(&dt), None));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_iou_calculation,
    bench_select_by_score,
    bench_full_evaluation
);
criterion_main!(benches);
