//! Image transforms applied before the forward pass.
//!
//! Images are HWC `f32` arrays with RGB channels in `[0, 1]`. The default
//! pipeline normalizes with ImageNet statistics and then letterboxes into a
//! square canvas, recording the resize factor on the sample so detections can
//! be mapped back to original pixels.

use crate::dataset::Sample;
use crate::error::{EvalError, Result};
use ndarray::{s, Array3};

/// A preprocessing step.
pub trait Transform {
    fn apply(&self, sample: Sample) -> Result<Sample>;
}

/// Apply transforms in order.
#[derive(Default)]
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    /// Normalize, then resize to `common_size`.
    pub fn standard(common_size: u32) -> Self {
        let normalizer: Box<dyn Transform> = Box::new(Normalizer::default());
        let resizer: Box<dyn Transform> = Box::new(Resizer::new(common_size));
        Self::new(vec![normalizer, resizer])
    }
}

impl Transform for Compose {
    fn apply(&self, sample: Sample) -> Result<Sample> {
        self.transforms
            .iter()
            .try_fold(sample, |sample, transform| transform.apply(sample))
    }
}

/// Per-channel `(x - mean) / std`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl Transform for Normalizer {
    fn apply(&self, mut sample: Sample) -> Result<Sample> {
        if sample.image.dim().2 != 3 {
            return Err(EvalError::InvalidImage(format!(
                "expected 3 channels, got {}",
                sample.image.dim().2
            )));
        }
        for c in 0..3 {
            let (mean, std) = (self.mean[c], self.std[c]);
            sample
                .image
                .slice_mut(s![.., .., c])
                .mapv_inplace(|v| (v - mean) / std);
        }
        Ok(sample)
    }
}

/// Scale the longer side to `common_size` and zero-pad to a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resizer {
    pub common_size: u32,
}

impl Resizer {
    pub fn new(common_size: u32) -> Self {
        Self { common_size }
    }

    /// Target (height, width) and the scale factor for an input size.
    pub fn target_size(&self, height: usize, width: usize) -> (usize, usize, f64) {
        let common = self.common_size as f64;
        if height > width {
            let scale = common / height as f64;
            let resized_w = ((width as f64 * scale) as usize).max(1);
            (self.common_size as usize, resized_w, scale)
        } else {
            let scale = common / width as f64;
            let resized_h = ((height as f64 * scale) as usize).max(1);
            (resized_h, self.common_size as usize, scale)
        }
    }
}

/// Bilinear resample with half-pixel centers.
fn resize_bilinear(image: &Array3<f32>, out_h: usize, out_w: usize) -> Array3<f32> {
    let (in_h, in_w, channels) = image.dim();
    let scale_y = in_h as f64 / out_h as f64;
    let scale_x = in_w as f64 / out_w as f64;

    let source = |dst: usize, scale: f64, len: usize| -> (usize, usize, f32) {
        let pos = ((dst as f64 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f64);
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(len - 1);
        (lo, hi, (pos - lo as f64) as f32)
    };

    let mut out = Array3::<f32>::zeros((out_h, out_w, channels));
    for y in 0..out_h {
        let (y0, y1, wy) = source(y, scale_y, in_h);
        for x in 0..out_w {
            let (x0, x1, wx) = source(x, scale_x, in_w);
            for c in 0..channels {
                let top = image[[y0, x0, c]] * (1.0 - wx) + image[[y0, x1, c]] * wx;
                let bottom = image[[y1, x0, c]] * (1.0 - wx) + image[[y1, x1, c]] * wx;
                out[[y, x, c]] = top * (1.0 - wy) + bottom * wy;
            }
        }
    }
    out
}

impl Transform for Resizer {
    fn apply(&self, mut sample: Sample) -> Result<Sample> {
        let (height, width, channels) = sample.image.dim();
        if height == 0 || width == 0 {
            return Err(EvalError::InvalidImage(
                "cannot resize an empty image".to_string(),
            ));
        }
        let (resized_h, resized_w, scale) = self.target_size(height, width);
        let resized = resize_bilinear(&sample.image, resized_h, resized_w);

        let side = self.common_size as usize;
        let mut canvas = Array3::<f32>::zeros((side, side, channels));
        canvas
            .slice_mut(s![..resized_h, ..resized_w, ..])
            .assign(&resized);

        sample.image = canvas;
        sample.scale *= scale;
        Ok(sample)
    }
}
