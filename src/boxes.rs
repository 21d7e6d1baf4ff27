//! Bounding box format conversions.
//!
//! Models emit corner boxes in the coordinates of the preprocessed image; COCO
//! results want `[x, y, width, height]` in original image pixels.

/// Bounding box in [x, y, width, height] format
pub type BBoxXYWH = [f64; 4];

/// Bounding box in [x1, y1, x2, y2] format
pub type BBoxXYXY = [f64; 4];

/// Convert bounding box from [x, y, width, height] to [x1, y1, x2, y2]
///
/// # Examples
///
/// ```
/// # use coco_map_eval::boxes::xywh_to_xyxy;
/// let xywh = [10.0, 20.0, 30.0, 40.0];
/// let xyxy = xywh_to_xyxy(xywh);
/// assert_eq!(xyxy, [10.0, 20.0, 40.0, 60.0]);
/// ```
#[must_use]
pub fn xywh_to_xyxy(bbox: BBoxXYWH) -> BBoxXYXY {
    [bbox[0], bbox[1], bbox[0] + bbox[2], bbox[1] + bbox[3]]
}

/// Convert bounding box from [x1, y1, x2, y2] to [x, y, width, height]
///
/// # Examples
///
/// ```
/// # use coco_map_eval::boxes::xyxy_to_xywh;
/// let xyxy = [10.0, 20.0, 40.0, 60.0];
/// let xywh = xyxy_to_xywh(xyxy);
/// assert_eq!(xywh, [10.0, 20.0, 30.0, 40.0]);
/// ```
#[must_use]
pub fn xyxy_to_xywh(bbox: BBoxXYXY) -> BBoxXYWH {
    [
        bbox[0],           // x = x1
        bbox[1],           // y = y1
        bbox[2] - bbox[0], // width = x2 - x1
        bbox[3] - bbox[1], // height = y2 - y1
    ]
}

/// Undo the preprocessing resize: divide every coordinate by `scale`.
#[must_use]
pub fn unscale(bbox: BBoxXYXY, scale: f64) -> BBoxXYXY {
    bbox.map(|v| v / scale)
}

/// Convert a raw model box (corner form, preprocessed coordinates) into a
/// COCO result box.
#[must_use]
pub fn model_box_to_coco(bbox: [f32; 4], scale: f64) -> BBoxXYWH {
    xyxy_to_xywh(unscale(bbox.map(f64::from), scale))
}
