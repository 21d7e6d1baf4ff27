//! Indexed view over a COCO annotation file.
//!
//! [`Coco`] is the ground-truth accessor the evaluator works against, and
//! [`Coco::load_res`] turns a detection-results file into a second `Coco`
//! sharing the ground truth's images and categories.

use crate::error::{EvalError, Result};
use crate::loader::{load_from_file, load_results_from_file};
use crate::types::{Annotation, Category, CocoDataset, Detection, Image};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// A COCO annotation set with image and category lookups.
#[derive(Debug, Clone)]
pub struct Coco {
    dataset: CocoDataset,
    image_ids: Vec<u64>,
    image_index: HashMap<u64, usize>,
    category_ids: Vec<u64>,
}

impl Coco {
    /// Index an already-loaded dataset.
    ///
    /// Image ids keep the order of the `images` list. Files without an
    /// `images` list fall back to the sorted ids referenced by annotations.
    pub fn new(dataset: CocoDataset) -> Self {
        let image_ids: Vec<u64> = match &dataset.images {
            Some(images) => images.iter().map(|img| img.id).collect(),
            None => dataset
                .annotations
                .iter()
                .map(|ann| ann.image_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        let image_index = dataset
            .images
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, img)| (img.id, i))
            .collect();

        let category_ids: Vec<u64> = dataset
            .categories
            .iter()
            .map(|cat| cat.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            dataset,
            image_ids,
            image_index,
            category_ids,
        }
    }

    /// Load and index an annotation file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("loading annotations from {}", path.display());
        let dataset = load_from_file(path)?;
        let coco = Self::new(dataset);
        tracing::debug!(
            images = coco.image_ids.len(),
            annotations = coco.dataset.annotations.len(),
            categories = coco.category_ids.len(),
            "annotation index created"
        );
        Ok(coco)
    }

    /// The underlying annotation file.
    pub fn dataset(&self) -> &CocoDataset {
        &self.dataset
    }

    /// All image ids, in annotation-file order.
    pub fn image_ids(&self) -> &[u64] {
        &self.image_ids
    }

    /// All category ids, ascending.
    pub fn category_ids(&self) -> &[u64] {
        &self.category_ids
    }

    /// Categories sorted by id.
    pub fn categories(&self) -> Vec<&Category> {
        let mut categories: Vec<&Category> = self.dataset.categories.iter().collect();
        categories.sort_by_key(|cat| cat.id);
        categories
    }

    /// Look up image metadata by id.
    pub fn image(&self, id: u64) -> Option<&Image> {
        let images = self.dataset.images.as_ref()?;
        self.image_index.get(&id).map(|&i| &images[i])
    }

    /// Whether an image id is part of this set.
    pub fn contains_image(&self, id: u64) -> bool {
        if self.dataset.images.is_some() {
            self.image_index.contains_key(&id)
        } else {
            self.image_ids.binary_search(&id).is_ok()
        }
    }

    /// All annotations.
    pub fn annotations(&self) -> &[Annotation] {
        &self.dataset.annotations
    }

    /// Load a detection-results file against this ground truth.
    pub fn load_res<P: AsRef<Path>>(&self, path: P) -> Result<Coco> {
        let path = path.as_ref();
        tracing::info!("loading detection results from {}", path.display());
        let detections = load_results_from_file(path)?;
        self.load_res_from_detections(&detections)
    }

    /// Build a results `Coco` from in-memory detections.
    ///
    /// Every detection must reference an image of this set. Detections get
    /// ids `1..=n` in input order, `area = w * h` and `iscrowd = 0`.
    pub fn load_res_from_detections(&self, detections: &[Detection]) -> Result<Coco> {
        if let Some(det) = detections
            .iter()
            .find(|det| !self.contains_image(det.image_id))
        {
            return Err(EvalError::InvalidAnnotation(format!(
                "Results do not correspond to current coco set: image {} is not in the ground truth",
                det.image_id
            )));
        }

        let annotations = detections
            .iter()
            .enumerate()
            .map(|(i, det)| Annotation {
                id: i as u64 + 1,
                image_id: det.image_id,
                category_id: det.category_id,
                bbox: det.bbox.to_vec(),
                area: Some(det.bbox[2] * det.bbox[3]),
                iscrowd: Some(0),
                score: Some(det.score),
            })
            .collect();

        Ok(Coco::new(CocoDataset {
            images: self.dataset.images.clone(),
            annotations,
            categories: self.dataset.categories.clone(),
        }))
    }
}
