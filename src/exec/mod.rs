// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the opaque external render command with `tokio::process::Command`,
//! one process at a time, streaming its output to the live log and
//! reporting how it terminated.

pub mod runner;

pub use runner::{ProcessOutcome, TaskRunner};
