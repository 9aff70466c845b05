// src/errors.rs

//! Typed failure taxonomy for the pipeline.
//!
//! Components raise these; the scheduler is the only layer that catches
//! them, isolating each failure to the job that produced it. `anyhow` is
//! re-exported for the application path.

pub use anyhow::{Error, Result};

use thiserror::Error as ThisError;

/// Failures raised by the ledger client.
#[derive(Debug, ThisError)]
pub enum LedgerError {
    /// The upsert payload lacks the table's key column. Fatal for that
    /// single upsert, not for the run.
    #[error("payload is missing key column '{key}' for table '{table}'")]
    MissingKey { table: String, key: String },

    /// No `asset`/`name` heading was found in the table prefix and the
    /// fallback header row has no usable key either.
    #[error("table '{table}' must have an 'Asset' or 'Name' column")]
    NoKeyColumn { table: String },

    /// A remote ledger call failed (network, API, or an undecodable
    /// response body).
    #[error("ledger remote call failed: {0}")]
    Remote(#[from] reqwest::Error),
}

/// Failures raised by the catalog client.
#[derive(Debug, ThisError)]
pub enum CatalogError {
    #[error("catalog remote call failed: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("catalog rejected the request: {0}")]
    Rejected(String),
}
