//! Writing detection results in COCO results format.

use crate::error::Result;
use crate::types::Detection;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// `<dir>/<set_name>_bbox_results.json`
pub fn results_path<P: AsRef<Path>>(dir: P, set_name: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_bbox_results.json", set_name))
}

/// Write detections to `path` as a JSON array indented by four spaces,
/// replacing any existing file.
pub fn write_results<P: AsRef<Path>>(path: P, detections: &[Detection]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    detections.serialize(&mut ser)?;
    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        detections = detections.len(),
        "wrote detection results"
    );
    Ok(())
}
