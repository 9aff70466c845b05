// tests/common/mod.rs

//! In-memory stand-ins for the remote ledger and catalog, shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use previewpipe::catalog::{AddItemRequest, CatalogApi, CatalogItem};
use previewpipe::config::LedgerSection;
use previewpipe::errors::{CatalogError, LedgerError};
use previewpipe::ledger::{LedgerClient, LedgerTransport, TableRef};

/// In-memory ledger keyed by tab name. Counts writes so tests can assert
/// write suppression.
#[derive(Default)]
pub struct FakeLedger {
    pub tabs: Mutex<HashMap<String, Vec<Vec<String>>>>,
    pub writes: Mutex<usize>,
}

impl FakeLedger {
    pub fn with_tab(tab: &str, rows: Vec<Vec<&str>>) -> Arc<Self> {
        let fake = Arc::new(Self::default());
        fake.set_tab(tab, rows);
        fake
    }

    pub fn set_tab(&self, tab: &str, rows: Vec<Vec<&str>>) {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        self.tabs.lock().unwrap().insert(tab.to_string(), rows);
    }

    pub fn tab(&self, tab: &str) -> Vec<Vec<String>> {
        self.tabs
            .lock()
            .unwrap()
            .get(tab)
            .cloned()
            .unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

/// Transport handle over the shared fake. The client owns this box while
/// the test keeps its own `Arc` for assertions.
pub struct SharedLedger(pub Arc<FakeLedger>);

#[async_trait]
impl LedgerTransport for SharedLedger {
    async fn get_rows(&self, table: &TableRef) -> Result<Vec<Vec<String>>, LedgerError> {
        Ok(self.0.tab(&table.tab))
    }

    async fn append_row(&self, table: &TableRef, values: Vec<String>) -> Result<(), LedgerError> {
        let mut tabs = self.0.tabs.lock().unwrap();
        tabs.entry(table.tab.clone()).or_default().push(values);
        *self.0.writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn update_row(
        &self,
        table: &TableRef,
        row_number: usize,
        values: Vec<String>,
    ) -> Result<(), LedgerError> {
        let mut tabs = self.0.tabs.lock().unwrap();
        let rows = tabs.entry(table.tab.clone()).or_default();
        assert!(row_number >= 1 && row_number <= rows.len(), "bad row number");
        rows[row_number - 1] = values;
        *self.0.writes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Ledger client wired to a fake transport.
pub fn client_for(fake: &Arc<FakeLedger>) -> LedgerClient {
    let section = LedgerSection {
        spreadsheet_id: "test-sheet".to_string(),
        ..LedgerSection::default()
    };
    LedgerClient::new(Box::new(SharedLedger(Arc::clone(fake))), &section)
}

/// In-memory catalog. `fail_trash` makes the trash call error so tests
/// can exercise partial failure.
#[derive(Default)]
pub struct FakeCatalog {
    pub items: Mutex<Vec<CatalogItem>>,
    pub trashed: Mutex<Vec<String>>,
    pub added: Mutex<Vec<AddItemRequest>>,
    pub fail_trash: bool,
}

impl FakeCatalog {
    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn list_items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn move_to_trash(&self, item_ids: &[String]) -> Result<(), CatalogError> {
        if self.fail_trash {
            return Err(CatalogError::Rejected("trash unavailable".to_string()));
        }
        self.trashed.lock().unwrap().extend_from_slice(item_ids);
        Ok(())
    }

    async fn add_from_path(&self, request: &AddItemRequest) -> Result<(), CatalogError> {
        self.added.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// A catalog item with empty tags.
pub fn item(id: &str, name: &str, annotation: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        name: name.to_string(),
        tags: Vec::new(),
        annotation: annotation.to_string(),
    }
}
