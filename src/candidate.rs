// src/candidate.rs

//! Asset categories and candidate discovery.
//!
//! A candidate is one authored scene file eligible for processing,
//! identified by its file stem ("asset id"). Discovery is deliberately
//! thin: walk a folder for files ending in the configured suffix. Which
//! folder maps to which category is the caller's business.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use tracing::debug;

/// The fixed set of asset kinds, one ledger tab and one catalog folder
/// each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Props,
    Characters,
    Creatures,
    Outfits,
    Hair,
    Effects,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Props,
        Category::Characters,
        Category::Creatures,
        Category::Outfits,
        Category::Hair,
        Category::Effects,
    ];

    /// Singular, lowercase value used in the ledger's `type` column.
    /// Batch-file `file_type` fields carry the plural category name
    /// instead.
    pub fn type_value(self) -> &'static str {
        match self {
            Category::Props => "prop",
            Category::Characters => "character",
            Category::Creatures => "creature",
            Category::Outfits => "outfit",
            Category::Hair => "hair",
            Category::Effects => "effect",
        }
    }

    /// Canonical display name, also the default ledger tab name.
    pub fn display_name(self) -> &'static str {
        match self {
            Category::Props => "Props",
            Category::Characters => "Characters",
            Category::Creatures => "Creatures",
            Category::Outfits => "Outfits",
            Category::Hair => "Hair",
            Category::Effects => "Effects",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One discovered asset, immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub category: Category,
}

impl Candidate {
    /// Asset id: source filename without extension.
    pub fn asset_id(&self) -> String {
        file_stem(&self.source_path)
    }
}

/// Filename without its final extension, lowercase-preserving.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Walk `folder` recursively for files whose name ends with `suffix`
/// (case-insensitive). Paths containing `incrementalSave` are autosave
/// copies and are skipped. Results come back sorted for a stable queue
/// order.
pub fn discover(
    folder: &Path,
    suffix: &str,
    output_dir: &Path,
    category: Category,
) -> Result<Vec<Candidate>> {
    let mut found = Vec::new();
    walk(folder, &suffix.to_lowercase(), &mut found)
        .with_context(|| format!("scanning scene folder {:?}", folder))?;
    found.sort();

    debug!(count = found.len(), folder = %folder.display(), "scene scan complete");

    Ok(found
        .into_iter()
        .map(|source_path| Candidate {
            source_path,
            output_dir: output_dir.to_path_buf(),
            category,
        })
        .collect())
}

fn walk(dir: &Path, suffix: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading directory {:?}", dir))? {
        let path = entry?.path();
        if path.to_string_lossy().contains("incrementalSave") {
            continue;
        }
        if path.is_dir() {
            walk(&path, suffix, out)?;
        } else if path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().to_lowercase().ends_with(suffix))
        {
            out.push(path);
        }
    }
    Ok(())
}
