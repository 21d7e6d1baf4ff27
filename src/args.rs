//! Command-line arguments for the `coco-map-eval` binary.

use clap::Parser;
use coco_map_eval::config::EvalConfig;
use coco_map_eval::model::{Device, ModelOptions, OutputLayout};
use coco_map_eval::threshold::{ScorePolicy, DEFAULT_SCORE_THRESHOLD};
use std::path::PathBuf;

/// Run a detection model over a COCO split and report bbox mAP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// ONNX model file
    #[arg(long, value_name = "FILE")]
    pub model: PathBuf,

    /// COCO root directory containing `annotations/` and `images/`
    #[arg(long, value_name = "DIR")]
    pub dataset: PathBuf,

    /// Number of classes the model was trained with (checked against the dataset only)
    #[arg(long = "num_classes", default_value_t = 1, value_name = "N")]
    pub num_classes: usize,

    /// Dataset split to evaluate
    #[arg(long, default_value = "val2017", value_name = "NAME")]
    pub split: String,

    /// Minimum score for a box to be written out (0.0 - 1.0)
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD, value_name = "THRESHOLD")]
    pub threshold: f64,

    /// How the threshold is applied to each image's boxes
    #[arg(long, value_enum, default_value_t = ScorePolicy::StopBelow)]
    pub score_policy: ScorePolicy,

    /// Inference device: cpu, cuda or cuda:N
    #[arg(long, default_value = "cpu", value_name = "DEVICE", value_parser = parse_device)]
    pub device: Device,

    /// Side of the square model input in pixels
    #[arg(long, default_value_t = 512, value_name = "PX")]
    pub input_size: u32,

    /// Directory the results file is written to
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// ONNX Runtime intra-op threads
    #[arg(long, default_value_t = 4, value_name = "N")]
    pub intra_threads: usize,
}

fn parse_device(s: &str) -> Result<Device, String> {
    s.parse::<Device>().map_err(|e| e.to_string())
}

impl From<Args> for EvalConfig {
    fn from(args: Args) -> Self {
        EvalConfig {
            model_path: args.model,
            dataset_root: args.dataset,
            set_name: args.split,
            num_classes: args.num_classes,
            score_threshold: args.threshold,
            score_policy: args.score_policy,
            input_size: args.input_size,
            output_dir: args.output_dir,
            model: ModelOptions {
                device: args.device,
                intra_threads: args.intra_threads,
                outputs: OutputLayout::default(),
            },
        }
    }
}
