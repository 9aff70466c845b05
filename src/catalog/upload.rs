// src/catalog/upload.rs

//! Batch upload of rendered previews into the catalog.
//!
//! Reads a per-category result batch file, replaces any catalog items
//! that already hold older renders of the same images (keeping their
//! human-assigned tags), and adds the new images with a rebuilt
//! annotation.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::candidate::{file_stem, Category};
use crate::catalog::client::{AddItemRequest, CatalogApi};
use crate::report::{load_batch, BatchEntry};

#[derive(Debug, Default)]
pub struct UploadReport {
    pub trashed: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Upload every entry of the batch file whose `file_type` matches
/// `category` into the catalog folder `folder_id`.
pub async fn upload_batch(
    catalog: &dyn CatalogApi,
    category: Category,
    folder_id: &str,
    batch_path: &Path,
) -> Result<UploadReport> {
    let batch = load_batch(batch_path)
        .with_context(|| format!("loading result batch {:?}", batch_path))?;
    info!(path = %batch_path.display(), entries = batch.len(), "loaded result batch");

    let targets: BTreeSet<String> = batch
        .values()
        .filter(|e| !e.imglink.is_empty())
        .map(|e| file_stem(Path::new(&e.imglink)).to_lowercase())
        .collect();

    let mut report = UploadReport::default();

    // Replace-before-add: trash catalog items holding older renders of
    // these images, remembering their tags so human tagging survives.
    let mut preserved_tags: HashMap<String, Vec<String>> = HashMap::new();
    let items = catalog
        .list_items()
        .await
        .context("listing catalog items before upload")?;

    let mut to_trash = Vec::new();
    for item in &items {
        let stem = file_stem(Path::new(&item.name)).to_lowercase();
        if targets.contains(&stem) {
            to_trash.push(item.id.clone());
            preserved_tags.insert(stem, item.tags.clone());
        }
    }

    if !to_trash.is_empty() {
        match catalog.move_to_trash(&to_trash).await {
            Ok(()) => {
                info!(count = to_trash.len(), "trashed superseded catalog items");
                report.trashed = to_trash.len();
            }
            Err(e) => warn!(error = %e, "could not trash superseded items, uploading anyway"),
        }
    }

    for (image_id, entry) in &batch {
        if !file_type_matches(&entry.file_type, category) {
            info!(
                image = %image_id,
                file_type = %entry.file_type,
                expected = %category.display_name().to_lowercase(),
                "skipping entry of another category"
            );
            report.skipped += 1;
            continue;
        }

        if entry.imglink.is_empty() || !Path::new(&entry.imglink).exists() {
            warn!(image = %image_id, path = %entry.imglink, "image not found, skipping");
            report.skipped += 1;
            continue;
        }

        let stem = file_stem(Path::new(&entry.imglink)).to_lowercase();
        let mut tags = entry.tags();
        for tag in preserved_tags.get(&stem).into_iter().flatten() {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        let request = AddItemRequest {
            path: entry.imglink.clone(),
            name: Path::new(&entry.imglink)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| image_id.clone()),
            tags,
            annotation: annotation_for(entry),
            folder_id: folder_id.to_string(),
        };

        match catalog.add_from_path(&request).await {
            Ok(()) => {
                info!(image = %image_id, "uploaded");
                report.uploaded += 1;
            }
            Err(e) => {
                warn!(image = %image_id, error = %e, "upload failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Batch files carry the plural category name in `file_type` ("props",
/// "outfits", ...); the singular ledger type value is tolerated too.
fn file_type_matches(file_type: &str, category: Category) -> bool {
    let ft = file_type.trim().to_lowercase();
    ft == category.display_name().to_lowercase() || ft == category.type_value()
}

/// The annotation format the reconciler later parses `malink:` out of.
fn annotation_for(entry: &BatchEntry) -> String {
    let poly = entry
        .poly_count
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let bbox = entry
        .bounding_box
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "malink: {}\n\npoly_count: {}\n\nbounding_box: [{}]\n\nrig_used: {}",
        entry.malink, poly, bbox, entry.rig_used
    )
}
