mod args;

use anyhow::{Context, Result};
use clap::Parser;
use coco_map_eval::config::EvalConfig;
use coco_map_eval::pipeline::{run_evaluation, EvalOutcome};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` directives when they parse, otherwise `info`.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(log_filter(std::env::var("RUST_LOG").ok()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let args = args::Args::parse();
    let config = EvalConfig::from(args);

    let outcome = run_evaluation(&config).with_context(|| {
        format!(
            "evaluating {} on {} ({})",
            config.model_path.display(),
            config.dataset_root.display(),
            config.set_name
        )
    })?;

    match outcome {
        EvalOutcome::NoDetections { images_visited } => {
            println!("No detections above threshold in {} images", images_visited);
        }
        EvalOutcome::Evaluated {
            results_path,
            stats,
            ..
        } => {
            stats.print_summary();
            println!("Results written to {}", results_path.display());
        }
    }

    Ok(())
}
