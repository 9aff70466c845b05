// src/engine/mod.rs

//! Orchestration engine for previewpipe.
//!
//! This module ties together:
//! - the rerun policy (which candidates need work)
//! - the result classifier (what a finished process means)
//! - the durable failures record
//! - the scheduler loop that drives one job at a time

pub mod classify;
pub mod failures;
pub mod policy;
pub mod scheduler;

pub use classify::{Classifier, JobOutcome};
pub use failures::FailureLog;
pub use policy::{decide, Decision, RerunPolicy, View, ViewSet};
pub use scheduler::{RunStats, Scheduler, SchedulerOptions};
