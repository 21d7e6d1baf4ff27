//! Run configuration.

use crate::error::{EvalError, Result};
use crate::model::ModelOptions;
use crate::threshold::{validate_threshold, ScorePolicy, DEFAULT_SCORE_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything one evaluation run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// ONNX model file.
    pub model_path: PathBuf,
    /// COCO root holding `annotations/` and `images/`.
    pub dataset_root: PathBuf,
    /// Split name, e.g. `val2017`.
    pub set_name: String,
    /// Class count the model was trained with. Only checked against the
    /// dataset, never used to remap labels.
    pub num_classes: usize,
    pub score_threshold: f64,
    pub score_policy: ScorePolicy,
    /// Side of the square model input.
    pub input_size: u32,
    /// Directory the results file is written to.
    pub output_dir: PathBuf,
    pub model: ModelOptions,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            dataset_root: PathBuf::new(),
            set_name: "val2017".to_string(),
            num_classes: 1,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            score_policy: ScorePolicy::StopBelow,
            input_size: 512,
            output_dir: PathBuf::from("."),
            model: ModelOptions::default(),
        }
    }
}

impl EvalConfig {
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.score_threshold)?;
        if self.input_size == 0 {
            return Err(EvalError::InvalidImage(
                "input size must be positive".to_string(),
            ));
        }
        if self.set_name.is_empty() {
            return Err(EvalError::EmptyDataset("split name is empty".to_string()));
        }
        Ok(())
    }
}
