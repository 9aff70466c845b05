// src/catalog/client.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::errors::CatalogError;

/// One item in the external asset catalog. Read-only here except for the
/// trash operation.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub annotation: String,
}

/// Payload for adding a rendered image to the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct AddItemRequest {
    pub path: String,
    pub name: String,
    pub tags: Vec<String>,
    pub annotation: String,
    #[serde(rename = "folderId")]
    pub folder_id: String,
}

/// Seam over the catalog's local API; tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_items(&self) -> Result<Vec<CatalogItem>, CatalogError>;
    async fn move_to_trash(&self, item_ids: &[String]) -> Result<(), CatalogError>;
    async fn add_from_path(&self, request: &AddItemRequest) -> Result<(), CatalogError>;
}

/// HTTP client against the catalog application's local API.
pub struct HttpCatalog {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Vec<CatalogItem>,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/item/{endpoint}", self.base_url)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn list_items(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        debug!("listing catalog items");
        let resp: ListResponse = self
            .client
            .get(self.url("list"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.data)
    }

    async fn move_to_trash(&self, item_ids: &[String]) -> Result<(), CatalogError> {
        debug!(count = item_ids.len(), "trashing catalog items");
        self.client
            .post(self.url("moveToTrash"))
            .json(&json!({ "itemIds": item_ids }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn add_from_path(&self, request: &AddItemRequest) -> Result<(), CatalogError> {
        debug!(name = %request.name, "adding catalog item");
        let resp = self
            .client
            .post(self.url("addFromPath"))
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Rejected(body));
        }
        Ok(())
    }
}
