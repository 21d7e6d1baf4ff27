//! Confidence score thresholding.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};

/// Default minimum score for a box to be written to the results file.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.05;

/// How the score threshold is applied to one image's boxes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScorePolicy {
    /// Walk boxes in model order and stop at the first score below the
    /// threshold. Relies on the model returning scores in descending order;
    /// anything after the first low score is dropped.
    #[default]
    StopBelow,
    /// Keep every box at or above the threshold, in model order.
    Filter,
}

/// Indices of the boxes that pass `threshold` under `policy`.
///
/// # Example
///
/// ```
/// use coco_map_eval::threshold::{select_by_score, ScorePolicy};
///
/// let scores = [0.9, 0.04, 0.6];
/// assert_eq!(select_by_score(&scores, 0.05, ScorePolicy::StopBelow), vec![0]);
/// assert_eq!(select_by_score(&scores, 0.05, ScorePolicy::Filter), vec![0, 2]);
/// ```
pub fn select_by_score(scores: &[f32], threshold: f64, policy: ScorePolicy) -> Vec<usize> {
    let passes = |score: f32| f64::from(score) >= threshold;
    match policy {
        ScorePolicy::StopBelow => scores
            .iter()
            .take_while(|&&s| passes(s))
            .enumerate()
            .map(|(i, _)| i)
            .collect(),
        ScorePolicy::Filter => scores
            .iter()
            .enumerate()
            .filter(|(_, &s)| passes(s))
            .map(|(i, _)| i)
            .collect(),
    }
}

/// Whether scores are in non-increasing order.
pub fn is_descending(scores: &[f32]) -> bool {
    scores.windows(2).all(|w| w[0] >= w[1])
}

/// Validate that a threshold is in the valid range [0.0, 1.0].
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(EvalError::InvalidThreshold(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            threshold
        )));
    }
    Ok(())
}
