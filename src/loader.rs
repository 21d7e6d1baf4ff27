//! JSON loading utilities for COCO annotation and detection-result files.

use crate::error::{EvalError, Result};
use crate::types::{CocoDataset, Detection};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Load a COCO annotation file from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if it fails
/// structural validation.
///
/// # Example
///
/// ```no_run
/// use coco_map_eval::loader::load_from_file;
///
/// let dataset = load_from_file("annotations/instances_val2017.json").unwrap();
/// println!("Loaded {} annotations", dataset.annotations.len());
/// ```
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<CocoDataset> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let dataset: CocoDataset = serde_json::from_reader(reader)?;

    validate_dataset(&dataset)?;

    Ok(dataset)
}

/// Load a COCO annotation file from a JSON string.
///
/// # Example
///
/// ```
/// use coco_map_eval::loader::load_from_string;
///
/// let json = r#"{
///     "annotations": [],
///     "categories": [{"id": 1, "name": "person"}]
/// }"#;
/// let dataset = load_from_string(json).unwrap();
/// assert_eq!(dataset.categories.len(), 1);
/// ```
pub fn load_from_string(json_str: &str) -> Result<CocoDataset> {
    let dataset: CocoDataset = serde_json::from_str(json_str)?;
    validate_dataset(&dataset)?;
    Ok(dataset)
}

/// Load a detection-results file: a JSON array of
/// `{image_id, category_id, score, bbox}` objects.
pub fn load_results_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Detection>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let detections: Vec<Detection> = serde_json::from_reader(reader)?;
    Ok(detections)
}

/// Load detection results from a JSON string.
pub fn load_results_from_string(json_str: &str) -> Result<Vec<Detection>> {
    Ok(serde_json::from_str(json_str)?)
}

/// Validate that a COCO dataset has the required structure.
fn validate_dataset(dataset: &CocoDataset) -> Result<()> {
    if dataset.categories.is_empty() {
        return Err(EvalError::EmptyDataset(
            "Dataset must contain at least one category".to_string(),
        ));
    }

    for annotation in &dataset.annotations {
        if annotation.bbox.len() != 4 {
            return Err(EvalError::InvalidAnnotation(format!(
                "Annotation {} has invalid bbox length: {}",
                annotation.id,
                annotation.bbox.len()
            )));
        }

        if annotation.bbox[2] < 0.0 || annotation.bbox[3] < 0.0 {
            return Err(EvalError::InvalidBoundingBox(format!(
                "Annotation {} has negative dimensions",
                annotation.id
            )));
        }
    }

    Ok(())
}
