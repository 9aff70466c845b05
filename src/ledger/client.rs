// src/ledger/client.rs

//! Caching client over the ledger transport.
//!
//! One instance is constructed per scheduler run and owns all per-table
//! state: the raw feed cache and the discovered header cache. Every
//! write to a table invalidates that table's caches, so the next read
//! re-fetches; there is exactly one writer (the sequential scheduler),
//! so no further locking is needed.

use std::collections::HashMap;

use chrono::Local;
use tracing::{debug, error, info};

use crate::candidate::Category;
use crate::config::LedgerSection;
use crate::errors::LedgerError;
use crate::ledger::row::{cleaned_heading, LedgerRow};
use crate::ledger::transport::{LedgerTransport, TableRef};

/// How many leading rows are scanned for a recognizable header.
const HEADER_SCAN_ROWS: usize = 10;

/// What an upsert actually did, mostly interesting to tests and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No matching row existed; a new one was appended.
    Appended,
    /// A matching row existed and at least one meaningful field changed.
    Updated,
    /// A matching row existed and nothing meaningful changed; the write
    /// was suppressed.
    Unchanged,
}

pub struct LedgerClient {
    transport: Box<dyn LedgerTransport>,
    spreadsheet_id: String,
    tabs: HashMap<Category, String>,
    author: String,

    feeds: HashMap<Category, Vec<Vec<String>>>,
    headers: HashMap<Category, (Vec<String>, usize)>,
}

impl LedgerClient {
    pub fn new(transport: Box<dyn LedgerTransport>, section: &LedgerSection) -> Self {
        let tabs = Category::ALL
            .iter()
            .map(|&c| (c, section.tab_for(c)))
            .collect();

        Self {
            transport,
            spreadsheet_id: section.spreadsheet_id.clone(),
            tabs,
            author: os_username(),
            feeds: HashMap::new(),
            headers: HashMap::new(),
        }
    }

    fn table_ref(&self, category: Category) -> TableRef {
        let tab = self
            .tabs
            .get(&category)
            .cloned()
            .unwrap_or_else(|| category.display_name().to_string());
        TableRef {
            spreadsheet_id: self.spreadsheet_id.clone(),
            tab,
        }
    }

    fn invalidate(&mut self, category: Category) {
        self.feeds.remove(&category);
        self.headers.remove(&category);
    }

    /// Raw rows for a table, fetched once and cached until the next
    /// write to that table.
    pub async fn rows(&mut self, category: Category) -> Result<&[Vec<String>], LedgerError> {
        if !self.feeds.contains_key(&category) {
            let table = self.table_ref(category);
            let rows = self.transport.get_rows(&table).await?;
            debug!(%table, rows = rows.len(), "cached ledger feed");
            self.feeds.insert(category, rows);
        }
        Ok(self
            .feeds
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// Cleaned header names and the index of the header row.
    ///
    /// Scans the first [`HEADER_SCAN_ROWS`] rows for one containing an
    /// `asset` or `name` heading after cleaning; falls back to treating
    /// row 0 as the header. The discovered column order is authoritative
    /// for the table until the cache is invalidated.
    pub async fn headings_and_row_index(
        &mut self,
        category: Category,
    ) -> Result<(Vec<String>, usize), LedgerError> {
        if let Some(cached) = self.headers.get(&category) {
            return Ok(cached.clone());
        }

        let feed = self.rows(category).await?;

        let mut discovered: Option<(Vec<String>, usize)> = None;
        for (idx, raw) in feed.iter().take(HEADER_SCAN_ROWS).enumerate() {
            let heads: Vec<String> = raw.iter().map(|c| cleaned_heading(c)).collect();
            if heads.iter().any(|h| h == "asset" || h == "name") {
                discovered = Some((heads, idx));
                break;
            }
        }

        let entry = discovered.unwrap_or_else(|| {
            let heads = feed
                .first()
                .map(|raw| raw.iter().map(|c| cleaned_heading(c)).collect())
                .unwrap_or_default();
            (heads, 0)
        });

        self.headers.insert(category, entry.clone());
        Ok(entry)
    }

    /// Index and cleaned name of the table's key column.
    pub async fn key_column(&mut self, category: Category) -> Result<(usize, String), LedgerError> {
        let (heads, _) = self.headings_and_row_index(category).await?;
        for key in ["asset", "name"] {
            if let Some(idx) = heads.iter().position(|h| h == key) {
                return Ok((idx, key.to_string()));
            }
        }
        Err(LedgerError::NoKeyColumn {
            table: self.table_ref(category).to_string(),
        })
    }

    /// First data row whose key cell equals `key`, plus its 1-based sheet
    /// row number.
    ///
    /// Duplicate keys are a data-quality issue in the ledger itself;
    /// first match wins, deliberately.
    pub async fn find_row(
        &mut self,
        category: Category,
        key: &str,
    ) -> Result<Option<(Vec<String>, usize)>, LedgerError> {
        let (key_idx, _) = self.key_column(category).await?;
        let (_, header_idx) = self.headings_and_row_index(category).await?;
        let feed = self.rows(category).await?;

        for (i, raw) in feed.iter().enumerate().skip(header_idx + 1) {
            if raw.get(key_idx).map(String::as_str) == Some(key) {
                return Ok(Some((raw.clone(), i + 1)));
            }
        }
        Ok(None)
    }

    /// [`find_row`](Self::find_row) shaped as a heading-keyed row.
    pub async fn find_row_map(
        &mut self,
        category: Category,
        key: &str,
    ) -> Result<Option<LedgerRow>, LedgerError> {
        let (heads, _) = self.headings_and_row_index(category).await?;
        Ok(self
            .find_row(category, key)
            .await?
            .map(|(raw, _)| LedgerRow::from_cells(&heads, &raw)))
    }

    /// Insert-or-merge-update one row, write-suppressed when nothing
    /// meaningful changes.
    ///
    /// Payload keys are normalized like headers; the payload must carry
    /// the table's key column. `dateandtime` and `blame` are stamped on
    /// every write attempt and ignored by change detection.
    pub async fn upsert(
        &mut self,
        category: Category,
        payload: &LedgerRow,
    ) -> Result<UpsertOutcome, LedgerError> {
        let mut payload: LedgerRow = payload
            .iter()
            .map(|(k, v)| (cleaned_heading(k), v.to_string()))
            .collect();

        let (_, key_name) = self.key_column(category).await?;
        let key_val = match payload.get(&key_name) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                return Err(LedgerError::MissingKey {
                    table: self.table_ref(category).to_string(),
                    key: key_name,
                });
            }
        };

        payload.insert(
            "dateandtime",
            Local::now().format("%I:%M%p on %m/%d/%Y").to_string(),
        );
        payload.insert("blame", self.author.clone());

        let existing = self.find_row(category, &key_val).await?;
        let (heads, _) = self.headings_and_row_index(category).await?;
        let table = self.table_ref(category);

        let outcome = match existing {
            None => {
                let values = flatten_for_values(&heads, category, &payload);
                self.transport
                    .append_row(&table, values)
                    .await
                    .inspect_err(|e| error!(%table, key = %key_val, error = %e, "ledger append failed"))?;
                info!(%table, key = %key_val, "appended ledger row");
                UpsertOutcome::Appended
            }
            Some((raw, row_number)) => {
                let current = LedgerRow::from_cells(&heads, &raw);
                if !current.differs_from_payload(&payload) {
                    debug!(%table, key = %key_val, "upsert suppressed, no meaningful change");
                    return Ok(UpsertOutcome::Unchanged);
                }
                let merged = current.merged_with(&payload);
                let values = flatten_for_values(&heads, category, &merged);
                self.transport
                    .update_row(&table, row_number, values)
                    .await
                    .inspect_err(|e| error!(%table, key = %key_val, error = %e, "ledger update failed"))?;
                info!(%table, key = %key_val, row_number, "updated ledger row");
                UpsertOutcome::Updated
            }
        };

        self.invalidate(category);
        Ok(outcome)
    }

    /// Soft-delete marker used by the reconciler.
    pub async fn mark_deleted(
        &mut self,
        category: Category,
        asset_id: &str,
    ) -> Result<UpsertOutcome, LedgerError> {
        let (_, key_name) = self.key_column(category).await?;
        let mut payload = LedgerRow::default();
        payload.insert(key_name, asset_id);
        payload.insert("deleted", "Yes");
        self.upsert(category, &payload).await
    }
}

/// Lay a row out in header order: the `type` value goes in the first
/// column, every later column takes the payload value for its heading or
/// an empty string.
fn flatten_for_values(heads: &[String], category: Category, row: &LedgerRow) -> Vec<String> {
    let type_cell = row
        .get("type")
        .filter(|v| !v.is_empty())
        .unwrap_or(category.type_value())
        .to_string();

    let mut out = vec![type_cell];
    for head in heads.iter().skip(1) {
        out.push(row.get(head).unwrap_or("").to_string());
    }
    out
}

fn os_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
