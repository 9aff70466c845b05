// src/catalog/mod.rs

//! The external asset catalog: API client, deletion reconciler, and the
//! batch upload step.

pub mod client;
pub mod reconcile;
pub mod upload;

pub use client::{AddItemRequest, CatalogApi, CatalogItem, HttpCatalog};
pub use reconcile::{reconcile, resolve, ReconcileReport, Resolution};
pub use upload::{upload_batch, UploadReport};
