//! Datasets the evaluation loop can iterate.
//!
//! [`EvalDataset`] is what the inference procedure needs from a dataset:
//! indexed preprocessed samples, the ordered image ids, a mapping from the
//! model's contiguous labels to COCO category ids, and the ground truth.
//! [`CocoImageSet`] is the on-disk implementation for the standard COCO
//! layout:
//!
//! ```text
//! <root>/annotations/instances_<set>.json
//! <root>/images/<set>/<file_name>
//! ```

use crate::coco::Coco;
use crate::error::{EvalError, Result};
use crate::preprocess::{Compose, Transform};
use ndarray::Array3;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One preprocessed image ready for the forward pass.
#[derive(Debug, Clone)]
pub struct Sample {
    /// HWC, RGB.
    pub image: Array3<f32>,
    /// Factor the original image was resized by.
    pub scale: f64,
    pub image_id: u64,
}

/// A dataset the evaluation loop can run over.
pub trait EvalDataset {
    /// Number of images.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load and preprocess the image at `index`.
    fn sample(&self, index: usize) -> Result<Sample>;

    /// Image ids, index-aligned with [`EvalDataset::sample`].
    fn image_ids(&self) -> &[u64];

    /// COCO category id for a model label.
    fn label_to_coco_label(&self, label: i64) -> Result<u64>;

    /// Split name, e.g. `val2017`.
    fn set_name(&self) -> &str;

    /// Ground-truth annotations.
    fn coco(&self) -> &Coco;

    /// Number of categories the labels range over.
    fn num_classes(&self) -> usize;
}

/// Contiguous label <-> COCO category id mapping.
///
/// Categories are sorted by id and numbered from 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    coco_labels: Vec<u64>,
    coco_labels_inverse: HashMap<u64, i64>,
    names: Vec<String>,
}

impl LabelMap {
    pub fn from_coco(coco: &Coco) -> Self {
        let mut map = Self::default();
        for (label, category) in coco.categories().into_iter().enumerate() {
            map.coco_labels.push(category.id);
            map.coco_labels_inverse.insert(category.id, label as i64);
            map.names.push(category.name.clone());
        }
        map
    }

    pub fn len(&self) -> usize {
        self.coco_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coco_labels.is_empty()
    }

    pub fn label_to_coco_label(&self, label: i64) -> Result<u64> {
        usize::try_from(label)
            .ok()
            .and_then(|l| self.coco_labels.get(l).copied())
            .ok_or(EvalError::UnknownLabel(label))
    }

    pub fn coco_label_to_label(&self, coco_label: u64) -> Option<i64> {
        self.coco_labels_inverse.get(&coco_label).copied()
    }

    /// Category name for a label.
    pub fn label_name(&self, label: i64) -> Option<&str> {
        usize::try_from(label)
            .ok()
            .and_then(|l| self.names.get(l))
            .map(String::as_str)
    }
}

/// A COCO split on disk.
pub struct CocoImageSet {
    root_dir: PathBuf,
    set_name: String,
    coco: Coco,
    image_ids: Vec<u64>,
    labels: LabelMap,
    transform: Compose,
}

impl CocoImageSet {
    /// Open `<root>/annotations/instances_<set_name>.json`.
    pub fn open<P: AsRef<Path>>(root_dir: P, set_name: &str, transform: Compose) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        let annotations = root_dir
            .join("annotations")
            .join(format!("instances_{}.json", set_name));
        let coco = Coco::from_file(&annotations)?;

        if coco.dataset().images.is_none() {
            return Err(EvalError::EmptyDataset(format!(
                "{} has no images list",
                annotations.display()
            )));
        }

        let image_ids = coco.image_ids().to_vec();
        let labels = LabelMap::from_coco(&coco);
        tracing::info!(
            set = set_name,
            images = image_ids.len(),
            classes = labels.len(),
            "opened COCO split"
        );

        Ok(Self {
            root_dir,
            set_name: set_name.to_string(),
            coco,
            image_ids,
            labels,
            transform,
        })
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Path of the image file at `index`.
    pub fn image_path(&self, index: usize) -> Result<PathBuf> {
        let image_id = *self.image_ids.get(index).ok_or(EvalError::IndexOutOfRange {
            index,
            len: self.image_ids.len(),
        })?;
        let info = self.coco.image(image_id).ok_or_else(|| {
            EvalError::InvalidAnnotation(format!("no image entry for id {}", image_id))
        })?;
        Ok(self
            .root_dir
            .join("images")
            .join(&self.set_name)
            .join(&info.file_name))
    }

    /// Decode the image at `index` as RGB in `[0, 1]`, HWC.
    pub fn load_image(&self, index: usize) -> Result<Array3<f32>> {
        let path = self.image_path(index)?;
        let rgb = image::open(&path)?.to_rgb32f();
        let (width, height) = rgb.dimensions();
        Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw()).map_err(|e| {
            EvalError::InvalidImage(format!("{}: {}", path.display(), e))
        })
    }
}

impl EvalDataset for CocoImageSet {
    fn len(&self) -> usize {
        self.image_ids.len()
    }

    fn sample(&self, index: usize) -> Result<Sample> {
        let image = self.load_image(index)?;
        let sample = Sample {
            image,
            scale: 1.0,
            image_id: self.image_ids[index],
        };
        self.transform.apply(sample)
    }

    fn image_ids(&self) -> &[u64] {
        &self.image_ids
    }

    fn label_to_coco_label(&self, label: i64) -> Result<u64> {
        self.labels.label_to_coco_label(label)
    }

    fn set_name(&self) -> &str {
        &self.set_name
    }

    fn coco(&self) -> &Coco {
        &self.coco
    }

    fn num_classes(&self) -> usize {
        self.labels.len()
    }
}
