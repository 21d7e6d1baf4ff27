/// Statistics tracking for the inference loop
///
/// This module provides the counters collected while running a detector over
/// a dataset and turning its raw outputs into COCO detections.

use serde::{Deserialize, Serialize};

/// Statistics collected during inference
///
/// Tracks how many images were visited, how many boxes the model returned,
/// and where those boxes went on the way to the results file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    /// Number of images run through the model
    pub images_processed: usize,

    /// Number of images for which the model returned no boxes
    pub empty_images: usize,

    /// Total number of boxes returned by the model
    pub boxes_returned: usize,

    /// Number of detections written out
    pub detections_emitted: usize,

    /// Number of boxes discarded by the score threshold
    pub dropped_by_threshold: usize,

    /// Number of images whose scores were not in descending order
    pub out_of_order_images: usize,

    /// Number of passing boxes dropped for NaN or infinite values
    pub non_finite_dropped: usize,
}

impl InferenceStats {
    /// Create a new `InferenceStats` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one image and the number of boxes the model returned for it
    pub fn record_image(&mut self, boxes: usize) {
        self.images_processed += 1;
        self.boxes_returned += boxes;
        if boxes == 0 {
            self.empty_images += 1;
        }
    }

    /// Record the detections kept for an image out of `returned` boxes
    pub fn record_kept(&mut self, kept: usize, returned: usize) {
        self.detections_emitted += kept;
        self.dropped_by_threshold += returned.saturating_sub(kept);
    }

    /// Record a passing box dropped for non-finite coordinates or score
    pub fn record_non_finite(&mut self) {
        self.non_finite_dropped += 1;
    }

    /// Record an image whose scores arrived unsorted
    pub fn record_out_of_order(&mut self) {
        self.out_of_order_images += 1;
    }

    /// Fraction of returned boxes that survived thresholding
    pub fn keep_rate(&self) -> f64 {
        if self.boxes_returned == 0 {
            0.0
        } else {
            self.detections_emitted as f64 / self.boxes_returned as f64
        }
    }

    /// Print a summary of the statistics to stdout
    pub fn print_summary(&self) {
        println!("\n=== Inference Statistics ===");
        println!("Images processed: {}", self.images_processed);
        println!("Images without boxes: {}", self.empty_images);
        println!("Boxes returned: {}", self.boxes_returned);
        println!("Detections emitted: {}", self.detections_emitted);
        println!("Dropped by threshold: {}", self.dropped_by_threshold);
        println!("Keep rate: {:.1}%", self.keep_rate() * 100.0);
        if self.non_finite_dropped > 0 {
            println!("Dropped as non-finite: {}", self.non_finite_dropped);
        }
        if self.out_of_order_images > 0 {
            println!("Images with unsorted scores: {}", self.out_of_order_images);
        }
        println!("===========================\n");
    }

    /// Get a formatted string summary of the statistics
    pub fn summary_string(&self) -> String {
        format!(
            "InferenceStats {{ images: {}, empty: {}, boxes: {}, emitted: {}, dropped: {}, non_finite: {}, keep_rate: {:.1}% }}",
            self.images_processed,
            self.empty_images,
            self.boxes_returned,
            self.detections_emitted,
            self.dropped_by_threshold,
            self.non_finite_dropped,
            self.keep_rate() * 100.0
        )
    }
}
