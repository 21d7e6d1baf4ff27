//! Metrics calculation modules for COCO evaluation.

pub mod iou;
pub mod ap;
pub mod precision_recall;

pub use iou::{calculate_iou, calculate_iou_crowd, calculate_iou_matrix};
pub use ap::calculate_map;
pub use precision_recall::{
    coco_recall_levels, interpolate_precision, make_monotone, precision_recall_curve,
    PrecisionRecallCurve,
};
