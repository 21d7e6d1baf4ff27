//! End-to-end run: inference, results file, COCO evaluation.

use crate::config::EvalConfig;
use crate::dataset::{CocoImageSet, EvalDataset};
use crate::error::Result;
use crate::evaluator::CocoEvaluator;
use crate::inference::collect_detections;
use crate::model::{Detector, OnnxDetector};
use crate::preprocess::Compose;
use crate::results::{results_path, write_results};
use crate::stats::InferenceStats;
use crate::types::EvaluationMetrics;
use std::path::PathBuf;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// The model produced nothing above the threshold; no file was written
    /// and evaluation was skipped.
    NoDetections { images_visited: usize },
    Evaluated {
        results_path: PathBuf,
        metrics: EvaluationMetrics,
        stats: InferenceStats,
    },
}

/// Open the dataset and model named by `config` and evaluate.
pub fn run_evaluation(config: &EvalConfig) -> Result<EvalOutcome> {
    config.validate()?;

    let transform = Compose::standard(config.input_size);
    let dataset = CocoImageSet::open(&config.dataset_root, &config.set_name, transform)?;
    if config.num_classes != dataset.num_classes() {
        tracing::warn!(
            requested = config.num_classes,
            dataset = dataset.num_classes(),
            "num_classes does not match the dataset; labels are mapped through the dataset categories"
        );
    }

    let mut model = OnnxDetector::load(&config.model_path, &config.model)?;
    evaluate_with(&dataset, &mut model, config)
}

/// Run inference with `model` over `dataset`, write the results file and
/// score it against the dataset's ground truth.
///
/// Evaluation is restricted to the images that were visited.
pub fn evaluate_with<D, M>(dataset: &D, model: &mut M, config: &EvalConfig) -> Result<EvalOutcome>
where
    D: EvalDataset + ?Sized,
    M: Detector + ?Sized,
{
    config.validate()?;

    let collected = collect_detections(
        dataset,
        model,
        config.score_threshold,
        config.score_policy,
    )?;

    if collected.results.is_empty() {
        tracing::warn!(
            images = collected.image_ids.len(),
            "no detections above threshold, skipping evaluation"
        );
        return Ok(EvalOutcome::NoDetections {
            images_visited: collected.image_ids.len(),
        });
    }

    let path = results_path(&config.output_dir, dataset.set_name());
    write_results(&path, &collected.results)?;

    let coco_gt = dataset.coco();
    let coco_dt = coco_gt.load_res(&path)?;
    let mut evaluator = CocoEvaluator::new(coco_gt, &coco_dt);
    evaluator.params.img_ids = collected.image_ids.clone();
    evaluator.evaluate()?;
    evaluator.accumulate()?;
    let metrics = evaluator.summarize()?.clone();

    Ok(EvalOutcome::Evaluated {
        results_path: path,
        metrics,
        stats: collected.stats,
    })
}
