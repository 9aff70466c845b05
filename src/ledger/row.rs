// src/ledger/row.rs

//! Row and cell-value model for ledger tables.
//!
//! Headings are normalized with [`cleaned_heading`] (keep alphanumerics,
//! lowercase) before any lookup, so `"Number of Textures"` and
//! `"numberoftextures"` address the same column. Rows are plain maps from
//! cleaned heading to cell string; the table's discovered column order
//! lives in the client, not here.

use std::collections::BTreeMap;

/// Fields stamped on every write and excluded from change detection.
pub const VOLATILE_FIELDS: &[&str] = &["date", "dateandtime", "blame"];

/// Cell values recognized as "checked" in boolean columns,
/// compared case-insensitively.
const TRUTHY_VALUES: &[&str] = &["true", "yes", "y", "1", "on", "x", "\u{2713}"];

/// Normalize a header cell: keep only alphanumeric characters, lowercase.
pub fn cleaned_heading(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Whether a cell reads as a checked/true value.
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    TRUTHY_VALUES.iter().any(|t| *t == v)
}

/// Whether a cell carries meaningful content for change detection.
/// Empty strings and serialized empty containers do not.
pub fn is_meaningful(value: &str) -> bool {
    !matches!(value.trim(), "" | "{}" | "[]")
}

/// A ledger row keyed by cleaned heading.
///
/// Human-entered extra columns survive round trips untouched: merging a
/// payload only overwrites the keys the payload carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerRow {
    values: BTreeMap<String, String>,
}

impl LedgerRow {
    /// Zip raw cells against the table's cleaned headings.
    /// Missing trailing cells are simply absent keys.
    pub fn from_cells(headings: &[String], cells: &[String]) -> Self {
        let values = headings
            .iter()
            .zip(cells.iter())
            .map(|(h, c)| (h.clone(), c.clone()))
            .collect();
        Self { values }
    }

    pub fn get(&self, heading: &str) -> Option<&str> {
        self.values.get(heading).map(String::as_str)
    }

    /// Whether the named boolean column is present and truthy.
    pub fn flag(&self, heading: &str) -> bool {
        self.get(heading).is_some_and(is_truthy)
    }

    pub fn insert(&mut self, heading: impl Into<String>, value: impl Into<String>) {
        self.values.insert(heading.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `payload` over this row: payload wins per key, everything
    /// else is preserved.
    pub fn merged_with(&self, payload: &LedgerRow) -> LedgerRow {
        let mut merged = self.clone();
        for (k, v) in payload.iter() {
            merged.insert(k, v);
        }
        merged
    }

    /// Whether writing `payload` over this row would change anything that
    /// matters.
    ///
    /// Volatile fields are ignored on both sides, and a payload value
    /// that is empty/meaningless never counts as a difference (we do not
    /// blank out human-entered cells).
    pub fn differs_from_payload(&self, payload: &LedgerRow) -> bool {
        payload
            .iter()
            .filter(|(k, _)| !VOLATILE_FIELDS.contains(k))
            .filter(|(_, v)| is_meaningful(v))
            .any(|(k, v)| self.get(k).unwrap_or("") != v)
    }
}

impl FromIterator<(String, String)> for LedgerRow {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
