// src/report.rs

//! Files the render process leaves behind for the pipeline.
//!
//! - The per-job summary hand-off: one small JSON object with geometry
//!   and shader counts, read exactly once after the process exits.
//! - The per-category result batch: a JSON map keyed by rendered-image
//!   id, written and merged on the renderer side, consumed here by the
//!   catalog upload step.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Summary written by the render task next to its images.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSummary {
    #[serde(rename = "type", default)]
    pub asset_type: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub polycount: Option<u64>,
    #[serde(default)]
    pub num_textures: Option<u64>,
    #[serde(default)]
    pub num_shaders: Option<u64>,
    #[serde(default)]
    pub missing_textures: bool,
}

/// Where a job's summary hand-off lands.
pub fn summary_path(output_dir: &Path, asset_id: &str) -> PathBuf {
    output_dir.join(format!("{asset_id}_summary.json"))
}

/// Read and consume the summary hand-off for one job.
///
/// Absence is tolerated (the render may have died before writing it);
/// a present-but-unreadable file is tolerated too, with a warning, so a
/// bad summary never fails the job it belongs to. A successfully read
/// file is removed, making each result consumed exactly once.
pub fn take_summary(output_dir: &Path, asset_id: &str) -> Option<JobSummary> {
    let path = summary_path(output_dir, asset_id);
    if !path.exists() {
        debug!(asset = %asset_id, "no summary hand-off file");
        return None;
    }

    let parsed = fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str::<JobSummary>(&text).map_err(Into::into));

    match parsed {
        Ok(summary) => {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "could not remove consumed summary file");
            }
            Some(summary)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable summary hand-off, treating as absent");
            None
        }
    }
}

/// One entry of the per-category result batch file, keyed by
/// rendered-image id. Tag columns (`tag1`, `tag2`, ...) and any future
/// fields ride along in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchEntry {
    #[serde(default)]
    pub imglink: String,
    #[serde(default)]
    pub malink: String,
    #[serde(default)]
    pub poly_count: Option<u64>,
    #[serde(default)]
    pub bounding_box: Vec<f64>,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub rig_used: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BatchEntry {
    /// Values of the `tag<N>` fields, in field order.
    pub fn tags(&self) -> Vec<String> {
        self.extra
            .iter()
            .filter(|(k, _)| k.to_lowercase().starts_with("tag"))
            .filter_map(|(_, v)| v.as_str().map(str::to_string))
            .collect()
    }
}

pub type BatchFile = BTreeMap<String, BatchEntry>;

/// Load a result batch file; a missing file is an empty batch.
pub fn load_batch(path: &Path) -> Result<BatchFile> {
    if !path.exists() {
        return Ok(BatchFile::new());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("reading batch file {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parsing batch file {:?}", path))
}
