// src/catalog/reconcile.rs

//! Resolves free-text deletion terms against the catalog and soft-deletes
//! the matches there and in the ledger.
//!
//! A term can be an asset id, a file path, or a partial display name.
//! The `malink:` line the upload step writes into every annotation lets
//! us recover the canonical asset id even from a partial match.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::candidate::{file_stem, Category};
use crate::catalog::client::{CatalogApi, CatalogItem};
use crate::ledger::LedgerClient;

fn malink_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^\s*malink:\s*(\S+)").expect("malink pattern is valid")
    })
}

/// What one term resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub catalog_ids: Vec<String>,
    pub asset_ids: Vec<String>,
}

/// Match `term` against catalog items.
///
/// An item matches if its name-without-extension equals the term's
/// identity (filename without extension, case-insensitive), or if the
/// term appears as a substring of the item's name or annotation text.
/// Each match contributes its `malink:`-embedded asset id; an identity
/// match also contributes the identity itself.
pub fn resolve(term: &str, items: &[CatalogItem]) -> Resolution {
    let identity = file_stem(Path::new(term.trim()));
    let identity_lower = identity.to_lowercase();
    let term_lower = term.trim().to_lowercase();

    let mut resolution = Resolution::default();
    for item in items {
        let name_stem = file_stem(Path::new(&item.name)).to_lowercase();
        let name_match = !identity_lower.is_empty() && name_stem == identity_lower;
        let substring_match = !term_lower.is_empty()
            && (item.name.to_lowercase().contains(&term_lower)
                || item.annotation.to_lowercase().contains(&term_lower));

        if !(name_match || substring_match) {
            continue;
        }

        push_unique(&mut resolution.catalog_ids, item.id.clone());

        for capture in malink_pattern().captures_iter(&item.annotation) {
            let asset = file_stem(Path::new(&capture[1]));
            if !asset.is_empty() {
                push_unique(&mut resolution.asset_ids, asset);
            }
        }
        if name_match {
            push_unique(&mut resolution.asset_ids, identity.clone());
        }
    }
    resolution
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Result of one reconciliation pass. Partial failure is expected; each
/// side is reported independently.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Catalog item ids sent to trash.
    pub trashed: Vec<String>,
    /// Why the trash call failed, if it did.
    pub trash_error: Option<String>,
    /// Asset ids marked deleted, with the table they were found in.
    pub marked: Vec<(Category, String)>,
    /// Asset ids we could not mark, with the reason.
    pub mark_failures: Vec<(String, String)>,
}

/// Resolve every term, trash the matched catalog items in one call, then
/// mark each inferred asset's ledger row deleted.
///
/// A trash failure does not block ledger marking and vice versa.
pub async fn reconcile(
    catalog: &dyn CatalogApi,
    ledger: &mut LedgerClient,
    terms: &[String],
) -> Result<ReconcileReport> {
    let items = catalog
        .list_items()
        .await
        .context("listing catalog items for reconciliation")?;

    let mut catalog_ids = Vec::new();
    let mut asset_ids = Vec::new();
    for term in terms {
        let resolution = resolve(term, &items);
        if resolution.catalog_ids.is_empty() {
            warn!(term = %term, "no catalog item matched");
        }
        for id in resolution.catalog_ids {
            push_unique(&mut catalog_ids, id);
        }
        for id in resolution.asset_ids {
            push_unique(&mut asset_ids, id);
        }
    }

    let mut report = ReconcileReport::default();

    if !catalog_ids.is_empty() {
        match catalog.move_to_trash(&catalog_ids).await {
            Ok(()) => {
                info!(count = catalog_ids.len(), "trashed catalog items");
                report.trashed = catalog_ids;
            }
            Err(e) => {
                warn!(error = %e, "catalog trash call failed, continuing with ledger marking");
                report.trash_error = Some(e.to_string());
            }
        }
    }

    for asset in &asset_ids {
        match mark_first_match(ledger, asset).await {
            Ok(Some(category)) => {
                info!(asset = %asset, table = %category, "marked ledger row deleted");
                report.marked.push((category, asset.clone()));
            }
            Ok(None) => {
                warn!(asset = %asset, "no ledger row found in any table");
                report
                    .mark_failures
                    .push((asset.clone(), "no ledger row found".to_string()));
            }
            Err(e) => {
                warn!(asset = %asset, error = %e, "ledger marking failed");
                report.mark_failures.push((asset.clone(), e.to_string()));
            }
        }
    }

    Ok(report)
}

/// The table an asset belongs to is not recorded anywhere we can see, so
/// probe the configured tables in a fixed order and mark the first one
/// holding the row. A table that fails to probe (unreachable, no key
/// column) is skipped so it cannot block an asset living in a later
/// table; only the mark itself propagates errors.
async fn mark_first_match(
    ledger: &mut LedgerClient,
    asset_id: &str,
) -> Result<Option<Category>> {
    for category in Category::ALL {
        match ledger.find_row(category, asset_id).await {
            Ok(Some(_)) => {
                ledger.mark_deleted(category, asset_id).await?;
                return Ok(Some(category));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(table = %category, asset = %asset_id, error = %e, "table probe failed, trying the next");
            }
        }
    }
    Ok(None)
}
