//! Averaging precision and recall cells into COCO summary statistics.

/// Mean of the values that are not `-1.0` placeholders.
///
/// Returns `-1.0` when nothing is left, which is how COCO marks an empty
/// bucket (for example "AP small" on a dataset with no small objects).
///
/// # Example
///
/// ```
/// use coco_map_eval::metrics::ap::calculate_map;
///
/// assert!((calculate_map(&[0.8, 0.9, -1.0, 0.7]) - 0.8).abs() < 1e-10);
/// assert_eq!(calculate_map(&[-1.0, -1.0]), -1.0);
/// ```
pub fn calculate_map(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|&&v| v > -1.0)
        .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));

    if count == 0 {
        return -1.0;
    }

    sum / count as f64
}
