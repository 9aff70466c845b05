// src/ledger/mod.rs

//! Typed access to the remote, human-editable asset ledger.
//!
//! - [`row`] holds the cell/heading model and normalization rules.
//! - [`transport`] is the wire seam (HTTP in production, in-memory in
//!   tests).
//! - [`client`] layers caching, header discovery, row lookup and the
//!   merge-upsert on top.

pub mod client;
pub mod row;
pub mod transport;

pub use client::{LedgerClient, UpsertOutcome};
pub use row::{cleaned_heading, is_meaningful, is_truthy, LedgerRow, VOLATILE_FIELDS};
pub use transport::{HttpLedgerTransport, LedgerTransport, TableRef};
