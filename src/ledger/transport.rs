// src/ledger/transport.rs

//! Wire access to the remote row store.
//!
//! The ledger speaks a Sheets-style values API: whole-tab reads, row
//! appends against the `Tab!A:A` range, and absolute-position rewrites
//! via a batch update. [`LedgerTransport`] is the seam; tests substitute
//! an in-memory implementation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::LedgerError;

/// Identifies one tab of one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub spreadsheet_id: String,
    pub tab: String,
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}", self.spreadsheet_id, self.tab)
    }
}

#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Fetch every row of the tab, in sheet order. Rows are ragged: a
    /// row may carry fewer cells than the header.
    async fn get_rows(&self, table: &TableRef) -> Result<Vec<Vec<String>>, LedgerError>;

    /// Append one row after the last data row.
    async fn append_row(&self, table: &TableRef, values: Vec<String>) -> Result<(), LedgerError>;

    /// Rewrite a full row at a 1-based absolute position.
    async fn update_row(
        &self,
        table: &TableRef,
        row_number: usize,
        values: Vec<String>,
    ) -> Result<(), LedgerError>;
}

/// HTTP transport against the configured values API base URL.
///
/// Authentication is assumed to be pre-arranged (ambient credentials or
/// a local proxy); the pipeline never handles tokens itself.
pub struct HttpLedgerTransport {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl HttpLedgerTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn values_url(&self, table: &TableRef, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, table.spreadsheet_id, range
        )
    }
}

#[async_trait]
impl LedgerTransport for HttpLedgerTransport {
    async fn get_rows(&self, table: &TableRef) -> Result<Vec<Vec<String>>, LedgerError> {
        let url = self.values_url(table, &table.tab);
        debug!(%table, "fetching ledger rows");

        let resp: ValuesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.values)
    }

    async fn append_row(&self, table: &TableRef, values: Vec<String>) -> Result<(), LedgerError> {
        let range = format!("{}!A:A", table.tab);
        let url = format!("{}:append", self.values_url(table, &range));
        debug!(%table, "appending ledger row");

        self.client
            .post(&url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [values] }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn update_row(
        &self,
        table: &TableRef,
        row_number: usize,
        values: Vec<String>,
    ) -> Result<(), LedgerError> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values:batchUpdate",
            self.base_url, table.spreadsheet_id
        );
        debug!(%table, row_number, "rewriting ledger row");

        self.client
            .post(&url)
            .json(&json!({
                "valueInputOption": "USER_ENTERED",
                "data": [{
                    "range": format!("{}!A{}", table.tab, row_number),
                    "values": [values],
                }],
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
