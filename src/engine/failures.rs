// src/engine/failures.rs

//! Durable record of failed jobs, one line per failure.
//!
//! The file survives the process so artists can re-run crashed assets
//! later; each scheduler run truncates it before the first job.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Start a fresh record for this run.
    pub fn truncate(&self) -> Result<()> {
        File::create(&self.path)
            .with_context(|| format!("truncating failures record at {:?}", self.path))?;
        Ok(())
    }

    /// Append one `<asset> --- <note>` line.
    pub fn record(&self, asset_id: &str, note: &str) -> Result<()> {
        warn!(asset = %asset_id, note, "recording failure");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening failures record at {:?}", self.path))?;
        writeln!(file, "{asset_id} --- {note}")
            .with_context(|| format!("writing failures record at {:?}", self.path))?;
        Ok(())
    }
}
