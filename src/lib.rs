//! # coco-map-eval
//!
//! Evaluate an object detector on a COCO split and report bounding-box mAP.
//!
//! A run has three stages:
//!
//! - **Inference**: every image of the split is preprocessed, passed through
//!   the model, and its boxes are mapped back to original pixels and
//!   thresholded by score ([`inference::collect_detections`]).
//! - **Serialization**: detections are written as a COCO results file,
//!   `<split>_bbox_results.json` ([`results::write_results`]).
//! - **Evaluation**: the results file is scored against the ground truth
//!   with the standard COCO bbox protocol and the twelve summary statistics
//!   are printed ([`evaluator::CocoEvaluator`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use coco_map_eval::coco::Coco;
//! use coco_map_eval::evaluator::evaluate;
//! use coco_map_eval::loader::load_from_string;
//! use coco_map_eval::types::Detection;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gt = Coco::new(load_from_string(r#"{
//!     "images": [{"id": 1, "file_name": "1.jpg", "height": 100, "width": 100}],
//!     "annotations": [{"id": 1, "image_id": 1, "category_id": 1,
//!                      "bbox": [10, 10, 40, 40], "area": 1600, "iscrowd": 0}],
//!     "categories": [{"id": 1, "name": "person"}]
//! }"#)?);
//!
//! let dt = gt.load_res_from_detections(&[Detection {
//!     image_id: 1,
//!     category_id: 1,
//!     score: 0.9,
//!     bbox: [10.0, 10.0, 40.0, 40.0],
//! }])?;
//!
//! let metrics = evaluate(&gt, &dt, None)?;
//! assert!((metrics.map - 1.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
//!
//! ## Dataset layout
//!
//! ```text
//! <root>/annotations/instances_<split>.json
//! <root>/images/<split>/<file_name>
//! ```

pub mod boxes;
pub mod coco;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod inference;
pub mod loader;
pub mod matching;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod results;
pub mod stats;
pub mod threshold;
pub mod types;

// Re-export commonly used types and functions
pub use coco::Coco;
pub use config::EvalConfig;
pub use dataset::{CocoImageSet, EvalDataset, LabelMap, Sample};
pub use error::{EvalError, Result};
pub use evaluator::{CocoEvaluator, Params};
pub use inference::{collect_detections, Collected};
pub use loader::{load_from_file, load_from_string};
pub use model::{Detector, Device, OnnxDetector, RawDetections};
pub use pipeline::{evaluate_with, run_evaluation, EvalOutcome};
pub use stats::InferenceStats;
pub use threshold::ScorePolicy;
pub use types::{
    Annotation, BoundingBox, Category, CocoDataset, Detection, EvaluationMetrics, Image,
};
