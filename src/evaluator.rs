//! COCO bounding-box evaluation: evaluate, accumulate, summarize.
//!
//! [`CocoEvaluator`] follows the three-stage protocol of the reference COCO
//! toolkit:
//!
//! 1. [`CocoEvaluator::evaluate`] matches detections to ground truth per
//!    image, category and area range.
//! 2. [`CocoEvaluator::accumulate`] merges the per-image results into
//!    precision/recall tables over IoU thresholds, recall levels, categories,
//!    area ranges and detection limits.
//! 3. [`CocoEvaluator::summarize`] reduces the tables to the twelve standard
//!    statistics and prints them.

use crate::coco::Coco;
use crate::error::{EvalError, Result};
use crate::matching::{compute_ious, evaluate_image, sort_detections, ImageEvaluation};
use crate::metrics::ap::calculate_map;
use crate::metrics::precision_recall::{
    coco_recall_levels, interpolate_precision, make_monotone, precision_recall_curve,
};
use crate::types::{Annotation, EvaluationMetrics};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

/// Upper bound of the "all" area range.
const MAX_AREA: f64 = 1e5 * 1e5;

/// Evaluation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    /// Images to evaluate. Defaults to every ground-truth image.
    pub img_ids: Vec<u64>,
    /// Categories to evaluate. Defaults to every ground-truth category.
    pub cat_ids: Vec<u64>,
    pub iou_thrs: Vec<f64>,
    pub rec_thrs: Vec<f64>,
    pub max_dets: Vec<usize>,
    pub area_rng: Vec<[f64; 2]>,
    pub area_rng_lbl: Vec<String>,
    /// When false, categories are pooled and only boxes are compared.
    pub use_cats: bool,
}

impl Params {
    /// Standard COCO bbox parameters for a ground-truth set.
    pub fn for_ground_truth(gt: &Coco) -> Self {
        let mut img_ids = gt.image_ids().to_vec();
        img_ids.sort_unstable();
        Self {
            img_ids,
            cat_ids: gt.category_ids().to_vec(),
            ..Self::default()
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            img_ids: Vec::new(),
            cat_ids: Vec::new(),
            // 0.50:0.05:0.95
            iou_thrs: (0..10).map(|i| 0.5 + 0.05 * i as f64).collect(),
            rec_thrs: coco_recall_levels(),
            max_dets: vec![1, 10, 100],
            area_rng: vec![
                [0.0, MAX_AREA],
                [0.0, 32.0 * 32.0],
                [32.0 * 32.0, 96.0 * 96.0],
                [96.0 * 96.0, MAX_AREA],
            ],
            area_rng_lbl: ["all", "small", "medium", "large"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            use_cats: true,
        }
    }
}

/// Precision/recall tables produced by [`CocoEvaluator::accumulate`].
///
/// `precision` and `scores` are `[T][R][K][A][M]`, `recall` is
/// `[T][K][A][M]`, flattened row-major. Cells with no ground truth hold -1.
#[derive(Debug, Clone)]
pub struct Accumulated {
    pub dims: [usize; 5],
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub scores: Vec<f64>,
}

impl Accumulated {
    fn new(t: usize, r: usize, k: usize, a: usize, m: usize) -> Self {
        Self {
            dims: [t, r, k, a, m],
            precision: vec![-1.0; t * r * k * a * m],
            recall: vec![-1.0; t * k * a * m],
            scores: vec![-1.0; t * r * k * a * m],
        }
    }

    /// Flat index into `precision`/`scores`.
    pub fn precision_index(&self, t: usize, r: usize, k: usize, a: usize, m: usize) -> usize {
        let [_, nr, nk, na, nm] = self.dims;
        (((t * nr + r) * nk + k) * na + a) * nm + m
    }

    /// Flat index into `recall`.
    pub fn recall_index(&self, t: usize, k: usize, a: usize, m: usize) -> usize {
        let [_, _, nk, na, nm] = self.dims;
        ((t * nk + k) * na + a) * nm + m
    }
}

/// COCO bbox evaluator over a ground-truth set and a detection-results set.
pub struct CocoEvaluator<'a> {
    coco_gt: &'a Coco,
    coco_dt: &'a Coco,
    pub params: Params,
    /// Per (category, area, image) results, image index fastest.
    eval_imgs: Option<Vec<Option<ImageEvaluation>>>,
    /// Parameters as normalized by the last `evaluate` call.
    eval_params: Option<Params>,
    eval: Option<Accumulated>,
    stats: Option<EvaluationMetrics>,
}

impl<'a> CocoEvaluator<'a> {
    /// Create an evaluator with standard bbox parameters.
    pub fn new(coco_gt: &'a Coco, coco_dt: &'a Coco) -> Self {
        Self {
            coco_gt,
            coco_dt,
            params: Params::for_ground_truth(coco_gt),
            eval_imgs: None,
            eval_params: None,
            eval: None,
            stats: None,
        }
    }

    /// Per-image matching results from the last `evaluate` call.
    pub fn eval_imgs(&self) -> Option<&[Option<ImageEvaluation>]> {
        self.eval_imgs.as_deref()
    }

    /// Tables from the last `accumulate` call.
    pub fn accumulated(&self) -> Option<&Accumulated> {
        self.eval.as_ref()
    }

    /// Metrics from the last `summarize` call.
    pub fn stats(&self) -> Option<&EvaluationMetrics> {
        self.stats.as_ref()
    }

    fn category_keys(params: &Params) -> Vec<Option<u64>> {
        if params.use_cats {
            params.cat_ids.iter().copied().map(Some).collect()
        } else {
            vec![None]
        }
    }

    fn group<'b>(
        annotations: &'b [Annotation],
        params: &Params,
    ) -> HashMap<(u64, Option<u64>), Vec<&'b Annotation>> {
        let img_set: BTreeSet<u64> = params.img_ids.iter().copied().collect();
        let cat_set: BTreeSet<u64> = params.cat_ids.iter().copied().collect();

        let mut groups: HashMap<(u64, Option<u64>), Vec<&Annotation>> = HashMap::new();
        for ann in annotations {
            if !img_set.contains(&ann.image_id) {
                continue;
            }
            let key = if params.use_cats {
                if !cat_set.contains(&ann.category_id) {
                    continue;
                }
                Some(ann.category_id)
            } else {
                None
            };
            groups.entry((ann.image_id, key)).or_default().push(ann);
        }
        groups
    }

    /// Run per-image matching for every (category, area range, image).
    pub fn evaluate(&mut self) -> Result<()> {
        let start = Instant::now();
        tracing::info!("Running per image evaluation...");

        let mut params = self.params.clone();
        params.img_ids = dedup_sorted(&params.img_ids);
        params.cat_ids = dedup_sorted(&params.cat_ids);
        params.max_dets.sort_unstable();
        let max_det = params.max_dets.last().copied().unwrap_or(0);

        let gts = Self::group(self.coco_gt.annotations(), &params);
        let dts = Self::group(self.coco_dt.annotations(), &params);

        let cat_keys = Self::category_keys(&params);
        let num_area = params.area_rng.len();
        let num_img = params.img_ids.len();
        let mut eval_imgs: Vec<Option<ImageEvaluation>> = vec![None; cat_keys.len() * num_area * num_img];

        let empty: Vec<&Annotation> = Vec::new();
        for (k, &cat) in cat_keys.iter().enumerate() {
            for (i, &img_id) in params.img_ids.iter().enumerate() {
                let gt = gts.get(&(img_id, cat)).unwrap_or(&empty);
                let dt = dts.get(&(img_id, cat)).unwrap_or(&empty);
                if gt.is_empty() && dt.is_empty() {
                    continue;
                }

                let dt_sorted = sort_detections(dt, max_det);
                let ious = compute_ious(&dt_sorted, gt)?;

                for (a, &area_range) in params.area_rng.iter().enumerate() {
                    eval_imgs[(k * num_area + a) * num_img + i] = evaluate_image(
                        img_id,
                        cat,
                        gt,
                        &dt_sorted,
                        &ious,
                        &params.iou_thrs,
                        area_range,
                        max_det,
                    );
                }
            }
        }

        self.eval_imgs = Some(eval_imgs);
        self.eval_params = Some(params);
        self.eval = None;
        self.stats = None;
        tracing::info!("DONE (t={:.2}s).", start.elapsed().as_secs_f64());
        Ok(())
    }

    /// Merge per-image results into precision/recall tables.
    pub fn accumulate(&mut self) -> Result<()> {
        let start = Instant::now();
        tracing::info!("Accumulating evaluation results...");

        let (Some(eval_imgs), Some(params)) = (&self.eval_imgs, &self.eval_params) else {
            return Err(EvalError::NotReady("run evaluate() before accumulate()"));
        };

        let num_thr = params.iou_thrs.len();
        let num_rec = params.rec_thrs.len();
        let num_cat = Self::category_keys(params).len();
        let num_area = params.area_rng.len();
        let num_max = params.max_dets.len();
        let num_img = params.img_ids.len();

        let mut acc = Accumulated::new(num_thr, num_rec, num_cat, num_area, num_max);

        for k in 0..num_cat {
            for a in 0..num_area {
                let offset = (k * num_area + a) * num_img;
                let evals: Vec<&ImageEvaluation> = eval_imgs[offset..offset + num_img]
                    .iter()
                    .flatten()
                    .collect();
                if evals.is_empty() {
                    continue;
                }

                let num_gt = evals
                    .iter()
                    .flat_map(|e| e.gt_ignore.iter())
                    .filter(|&&ignored| !ignored)
                    .count();
                if num_gt == 0 {
                    continue;
                }

                for (m, &max_det) in params.max_dets.iter().enumerate() {
                    // (score, image eval, detection index), merged across images
                    let mut merged: Vec<(f64, usize, usize)> = evals
                        .iter()
                        .enumerate()
                        .flat_map(|(e, ev)| {
                            ev.dt_scores
                                .iter()
                                .take(max_det)
                                .enumerate()
                                .map(move |(d, &s)| (s, e, d))
                        })
                        .collect();
                    merged.sort_by(|x, y| {
                        y.0.partial_cmp(&x.0).unwrap_or(std::cmp::Ordering::Equal)
                    });
                    let dt_scores: Vec<f64> = merged.iter().map(|&(s, _, _)| s).collect();

                    for t in 0..num_thr {
                        let mut tps = Vec::with_capacity(merged.len());
                        let mut fps = Vec::with_capacity(merged.len());
                        for &(_, e, d) in &merged {
                            let matched = evals[e].dt_matches[t][d].is_some();
                            let ignored = evals[e].dt_ignore[t][d];
                            tps.push(matched && !ignored);
                            fps.push(!matched && !ignored);
                        }

                        let mut curve = precision_recall_curve(&tps, &fps, num_gt);
                        let r_idx = acc.recall_index(t, k, a, m);
                        acc.recall[r_idx] = curve.final_recall();

                        make_monotone(&mut curve.precision);
                        let q = interpolate_precision(&curve.precision, &curve.recall, &params.rec_thrs);
                        for (r, &level) in params.rec_thrs.iter().enumerate() {
                            let p_idx = acc.precision_index(t, r, k, a, m);
                            acc.precision[p_idx] = q[r];
                            let pos = curve.recall.partition_point(|&rc| rc < level);
                            acc.scores[p_idx] = dt_scores.get(pos).copied().unwrap_or(0.0);
                        }
                    }
                }
            }
        }

        self.eval = Some(acc);
        self.stats = None;
        tracing::info!("DONE (t={:.2}s).", start.elapsed().as_secs_f64());
        Ok(())
    }

    fn summarize_stat(
        acc: &Accumulated,
        params: &Params,
        ap: bool,
        iou_thr: Option<f64>,
        area_lbl: &str,
        max_dets: usize,
    ) -> f64 {
        let Some(a) = params.area_rng_lbl.iter().position(|l| l == area_lbl) else {
            return -1.0;
        };
        let Some(m) = params.max_dets.iter().position(|&d| d == max_dets) else {
            return -1.0;
        };
        let thresholds: Vec<usize> = match iou_thr {
            Some(thr) => params
                .iou_thrs
                .iter()
                .enumerate()
                .filter(|(_, &x)| (x - thr).abs() < 1e-6)
                .map(|(t, _)| t)
                .collect(),
            None => (0..params.iou_thrs.len()).collect(),
        };

        let [_, num_rec, num_cat, _, _] = acc.dims;
        let mut values = Vec::new();
        for &t in &thresholds {
            for k in 0..num_cat {
                if ap {
                    for r in 0..num_rec {
                        values.push(acc.precision[acc.precision_index(t, r, k, a, m)]);
                    }
                } else {
                    values.push(acc.recall[acc.recall_index(t, k, a, m)]);
                }
            }
        }
        calculate_map(&values)
    }

    /// Compute the twelve standard statistics and per-category AP.
    pub fn compute_metrics(&self) -> Result<EvaluationMetrics> {
        let (Some(acc), Some(params)) = (&self.eval, &self.eval_params) else {
            return Err(EvalError::NotReady("run accumulate() before summarize()"));
        };

        let last_max = params.max_dets.last().copied().unwrap_or(100);
        let mut stats = [0.0; 12];
        for (slot, row) in stats.iter_mut().zip(SUMMARY_ROWS.iter()) {
            let max_dets = row.max_dets.unwrap_or(last_max);
            *slot = Self::summarize_stat(acc, params, row.ap, row.iou_thr, row.area, max_dets);
        }

        let mut metrics = EvaluationMetrics::from_stats(stats);

        if params.use_cats {
            let [num_thr, num_rec, _, _, num_max] = acc.dims;
            if num_max > 0 {
                for (k, &cat_id) in params.cat_ids.iter().enumerate() {
                    let mut values = Vec::with_capacity(num_thr * num_rec);
                    for t in 0..num_thr {
                        for r in 0..num_rec {
                            values.push(acc.precision[acc.precision_index(t, r, k, 0, num_max - 1)]);
                        }
                    }
                    metrics.ap_per_class.push((cat_id, calculate_map(&values)));
                }
            }
        }

        Ok(metrics)
    }

    /// The summary table, one line per statistic.
    pub fn summary_lines(&self) -> Result<Vec<String>> {
        let metrics = self.compute_metrics()?;
        let params = self
            .eval_params
            .as_ref()
            .ok_or(EvalError::NotReady("run accumulate() before summarize()"))?;
        let last_max = params.max_dets.last().copied().unwrap_or(100);
        let first_iou = params.iou_thrs.first().copied().unwrap_or(0.0);
        let last_iou = params.iou_thrs.last().copied().unwrap_or(0.0);

        Ok(SUMMARY_ROWS
            .iter()
            .zip(metrics.stats())
            .map(|(row, value)| {
                let (title, kind) = if row.ap {
                    ("Average Precision", "(AP)")
                } else {
                    ("Average Recall", "(AR)")
                };
                let iou = match row.iou_thr {
                    Some(thr) => format!("{:.2}", thr),
                    None => format!("{:.2}:{:.2}", first_iou, last_iou),
                };
                format!(
                    " {:<18} {} @[ IoU={:<9} | area={:>6} | maxDets={:>3} ] = {:.3}",
                    title,
                    kind,
                    iou,
                    row.area,
                    row.max_dets.unwrap_or(last_max),
                    value
                )
            })
            .collect())
    }

    /// Compute and print the summary table; returns the metrics.
    pub fn summarize(&mut self) -> Result<&EvaluationMetrics> {
        for line in self.summary_lines()? {
            println!("{}", line);
        }
        let metrics = self.compute_metrics()?;
        Ok(self.stats.insert(metrics))
    }
}

struct SummaryRow {
    ap: bool,
    iou_thr: Option<f64>,
    area: &'static str,
    /// `None` means the largest configured limit.
    max_dets: Option<usize>,
}

const SUMMARY_ROWS: [SummaryRow; 12] = [
    SummaryRow { ap: true, iou_thr: None, area: "all", max_dets: None },
    SummaryRow { ap: true, iou_thr: Some(0.5), area: "all", max_dets: None },
    SummaryRow { ap: true, iou_thr: Some(0.75), area: "all", max_dets: None },
    SummaryRow { ap: true, iou_thr: None, area: "small", max_dets: None },
    SummaryRow { ap: true, iou_thr: None, area: "medium", max_dets: None },
    SummaryRow { ap: true, iou_thr: None, area: "large", max_dets: None },
    SummaryRow { ap: false, iou_thr: None, area: "all", max_dets: Some(1) },
    SummaryRow { ap: false, iou_thr: None, area: "all", max_dets: Some(10) },
    SummaryRow { ap: false, iou_thr: None, area: "all", max_dets: None },
    SummaryRow { ap: false, iou_thr: None, area: "small", max_dets: None },
    SummaryRow { ap: false, iou_thr: None, area: "medium", max_dets: None },
    SummaryRow { ap: false, iou_thr: None, area: "large", max_dets: None },
];

fn dedup_sorted(ids: &[u64]) -> Vec<u64> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Evaluate detections against ground truth restricted to `img_ids`, running
/// all three stages without printing.
pub fn evaluate(coco_gt: &Coco, coco_dt: &Coco, img_ids: Option<Vec<u64>>) -> Result<EvaluationMetrics> {
    let mut evaluator = CocoEvaluator::new(coco_gt, coco_dt);
    if let Some(ids) = img_ids {
        evaluator.params.img_ids = ids;
    }
    evaluator.evaluate()?;
    evaluator.accumulate()?;
    evaluator.compute_metrics()
}
