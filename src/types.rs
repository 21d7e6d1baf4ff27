//! Core data types for COCO annotations, detections and evaluation results.

use serde::{Deserialize, Serialize};

/// Represents a bounding box in COCO format (x, y, width, height).
///
/// Coordinates are in LTWH (Left-Top-Width-Height) format where:
/// - x: Left coordinate
/// - y: Top coordinate
/// - width: Box width
/// - height: Box height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Get the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Get the right coordinate (x + width).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom coordinate (y + height).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Represents a category in the COCO dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
}

/// Represents an image in the COCO dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub file_name: String,
    pub height: u32,
    pub width: u32,
}

/// Represents an annotation in COCO format.
///
/// Ground truth and loaded detection results share this shape; results
/// carry a `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    /// Bounding box in [x, y, width, height] format
    pub bbox: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscrowd: Option<u8>,
    /// Confidence score (for predictions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Annotation {
    /// Convert the bbox array to a BoundingBox struct.
    pub fn to_bbox(&self) -> crate::error::Result<BoundingBox> {
        if self.bbox.len() != 4 {
            return Err(crate::error::EvalError::InvalidBoundingBox(format!(
                "Expected 4 values, got {}",
                self.bbox.len()
            )));
        }
        Ok(BoundingBox::new(
            self.bbox[0],
            self.bbox[1],
            self.bbox[2],
            self.bbox[3],
        ))
    }

    /// Get the confidence score, defaulting to 1.0 if not present.
    pub fn confidence(&self) -> f64 {
        self.score.unwrap_or(1.0)
    }

    /// Whether this is a crowd region.
    pub fn is_crowd(&self) -> bool {
        self.iscrowd.unwrap_or(0) != 0
    }

    /// Area used for area-range bucketing: the stored `area`, else `w * h`.
    pub fn effective_area(&self) -> f64 {
        self.area.unwrap_or_else(|| {
            if self.bbox.len() == 4 {
                self.bbox[2] * self.bbox[3]
            } else {
                0.0
            }
        })
    }
}

/// Represents a complete COCO annotation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

/// One predicted object instance in COCO detection-results format.
///
/// Serializes to `{"image_id", "category_id", "score", "bbox": [x, y, w, h]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub image_id: u64,
    pub category_id: u64,
    pub score: f64,
    pub bbox: [f64; 4],
}

/// The twelve standard COCO bbox statistics plus per-category AP.
///
/// A value of `-1.0` means no ground truth fell into that bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationMetrics {
    /// AP averaged over IoU=0.50:0.95
    pub map: f64,
    /// Average Precision at IoU=0.50
    pub ap50: f64,
    /// Average Precision at IoU=0.75
    pub ap75: f64,
    pub ap_small: f64,
    pub ap_medium: f64,
    pub ap_large: f64,
    /// Average Recall with at most 1 detection per image
    pub ar1: f64,
    pub ar10: f64,
    pub ar100: f64,
    pub ar_small: f64,
    pub ar_medium: f64,
    pub ar_large: f64,
    /// Per-category AP at IoU=0.50:0.95, all areas, 100 detections
    pub ap_per_class: Vec<(u64, f64)>,
}

impl EvaluationMetrics {
    /// Build from the twelve statistics in summary order.
    pub fn from_stats(stats: [f64; 12]) -> Self {
        Self {
            map: stats[0],
            ap50: stats[1],
            ap75: stats[2],
            ap_small: stats[3],
            ap_medium: stats[4],
            ap_large: stats[5],
            ar1: stats[6],
            ar10: stats[7],
            ar100: stats[8],
            ar_small: stats[9],
            ar_medium: stats[10],
            ar_large: stats[11],
            ap_per_class: Vec::new(),
        }
    }

    /// The twelve statistics in summary order.
    pub fn stats(&self) -> [f64; 12] {
        [
            self.map,
            self.ap50,
            self.ap75,
            self.ap_small,
            self.ap_medium,
            self.ap_large,
            self.ar1,
            self.ar10,
            self.ar100,
            self.ar_small,
            self.ar_medium,
            self.ar_large,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_serializes_expected_keys() {
        let det = Detection {
            image_id: 139,
            category_id: 1,
            score: 0.9,
            bbox: [1.0, 2.0, 3.0, 4.0],
        };
        let value = serde_json::to_value(&det).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(obj["image_id"], 139);
        assert_eq!(obj["category_id"], 1);
        assert_eq!(obj["bbox"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_effective_area_falls_back_to_box() {
        let ann = Annotation {
            id: 1,
            image_id: 1,
            category_id: 1,
            bbox: vec![0.0, 0.0, 10.0, 5.0],
            area: None,
            iscrowd: None,
            score: None,
        };
        assert_eq!(ann.effective_area(), 50.0);

        let with_area = Annotation { area: Some(12.0), ..ann };
        assert_eq!(with_area.effective_area(), 12.0);
    }

    #[test]
    fn test_stats_round_trip_order() {
        let stats = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, -1.0, 0.0];
        let metrics = EvaluationMetrics::from_stats(stats);
        assert_eq!(metrics.ap50, 0.2);
        assert_eq!(metrics.ar_medium, -1.0);
        assert_eq!(metrics.stats(), stats);
    }
}
