//! Detection models.
//!
//! A [`Detector`] turns one preprocessed HWC image into parallel score,
//! label and corner-box sequences. [`OnnxDetector`] runs an exported graph
//! through ONNX Runtime.

use crate::error::{EvalError, Result};
use ndarray::Array3;
use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Raw forward-pass output for one image.
///
/// Boxes are `[x1, y1, x2, y2]` in preprocessed-image coordinates. Models
/// are expected to return them sorted by descending score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    pub scores: Vec<f32>,
    pub labels: Vec<i64>,
    pub boxes: Vec<[f32; 4]>,
}

impl RawDetections {
    /// Assemble from flat output buffers, checking they describe the same
    /// number of boxes.
    pub fn from_flat(scores: Vec<f32>, labels: Vec<i64>, boxes: &[f32]) -> Result<Self> {
        if boxes.len() % 4 != 0 {
            return Err(EvalError::Model(format!(
                "box output has {} values, not a multiple of 4",
                boxes.len()
            )));
        }
        let boxes: Vec<[f32; 4]> = boxes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();

        if scores.len() != boxes.len() || labels.len() != boxes.len() {
            return Err(EvalError::Model(format!(
                "output lengths disagree: {} scores, {} labels, {} boxes",
                scores.len(),
                labels.len(),
                boxes.len()
            )));
        }

        Ok(Self { scores, labels, boxes })
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// An object detector.
pub trait Detector {
    /// Run the forward pass on one HWC image.
    fn detect(&mut self, image: &Array3<f32>) -> Result<RawDetections>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, image: &Array3<f32>) -> Result<RawDetections> {
        (**self).detect(image)
    }
}

/// Where inference runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(i32),
}

impl FromStr for Device {
    type Err = EvalError;

    /// Accepts `cpu`, `cuda` and `cuda:N`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|id| id.parse::<i32>().ok())
                .filter(|&id| id >= 0)
                .map(Device::Cuda)
                .ok_or_else(|| EvalError::UnsupportedDevice(s.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(id) => write!(f, "cuda:{}", id),
        }
    }
}

impl Device {
    fn execution_provider(&self) -> Result<ExecutionProviderDispatch> {
        match *self {
            Device::Cpu => Ok(ort::execution_providers::CPUExecutionProvider::default().build()),
            #[cfg(feature = "cuda")]
            Device::Cuda(id) => Ok(ort::execution_providers::CUDAExecutionProvider::default()
                .with_device_id(id)
                .build()
                .error_on_failure()),
            #[cfg(not(feature = "cuda"))]
            Device::Cuda(_) => Err(EvalError::UnsupportedDevice(format!(
                "{} (built without the `cuda` feature)",
                self
            ))),
        }
    }
}

/// Positions of the score, label and box tensors among the model outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub scores: usize,
    pub labels: usize,
    pub boxes: usize,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            scores: 0,
            labels: 1,
            boxes: 2,
        }
    }
}

/// ONNX Runtime session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub device: Device,
    pub intra_threads: usize,
    pub outputs: OutputLayout,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            intra_threads: 4,
            outputs: OutputLayout::default(),
        }
    }
}

/// A detector exported to ONNX.
///
/// Takes a single `[1, 3, H, W]` float input and produces scores, labels and
/// boxes as separate outputs.
pub struct OnnxDetector {
    session: Session,
    outputs: OutputLayout,
}

impl OnnxDetector {
    pub fn load(model_path: impl AsRef<Path>, options: &ModelOptions) -> Result<Self> {
        let path = model_path.as_ref();
        tracing::info!(
            model = %path.display(),
            device = %options.device,
            "loading ONNX model"
        );

        let provider = options.device.execution_provider()?;
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(options.intra_threads.max(1))?
            .with_execution_providers([provider])?
            .commit_from_file(path)?;

        Ok(Self {
            session,
            outputs: options.outputs,
        })
    }
}

/// Float class ids to integers. Anything that is not a whole number is an error
/// rather than being truncated onto a neighbouring class.
pub fn labels_from_f32(data: &[f32]) -> Result<Vec<i64>> {
    data.iter()
        .map(|&v| {
            if v.is_finite() && v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(EvalError::Model(format!(
                    "label output holds {}, expected a whole class index",
                    v
                )))
            }
        })
        .collect()
}

/// HWC image to a contiguous `[1, 3, H, W]` buffer.
pub fn to_nchw(image: &Array3<f32>) -> (Vec<i64>, Vec<f32>) {
    let (height, width, channels) = image.dim();
    let chw = image.view().permuted_axes([2, 0, 1]);
    let data: Vec<f32> = chw.iter().copied().collect();
    (vec![1, channels as i64, height as i64, width as i64], data)
}

impl Detector for OnnxDetector {
    fn detect(&mut self, image: &Array3<f32>) -> Result<RawDetections> {
        let (dims, data) = to_nchw(image);
        let input = TensorRef::from_array_view((dims, data.as_slice()))?;
        let outputs = self.session.run(ort::inputs![input])?;

        let layout = self.outputs;
        let needed = layout.scores.max(layout.labels).max(layout.boxes);
        if needed >= outputs.len() {
            return Err(EvalError::Model(format!(
                "model has {} outputs, layout needs index {}",
                outputs.len(),
                needed
            )));
        }

        let (_, scores) = outputs[layout.scores].try_extract_tensor::<f32>()?;
        let (_, boxes) = outputs[layout.boxes].try_extract_tensor::<f32>()?;

        let label_value = &outputs[layout.labels];
        let labels: Vec<i64> = if let Ok((_, data)) = label_value.try_extract_tensor::<i64>() {
            data.to_vec()
        } else if let Ok((_, data)) = label_value.try_extract_tensor::<i32>() {
            data.iter().map(|&v| i64::from(v)).collect()
        } else {
            let (_, data) = label_value.try_extract_tensor::<f32>()?;
            labels_from_f32(data)?
        };

        RawDetections::from_flat(scores.to_vec(), labels, boxes)
    }
}
