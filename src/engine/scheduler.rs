// src/engine/scheduler.rs

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::candidate::Candidate;
use crate::engine::classify::{Classifier, JobOutcome};
use crate::engine::failures::FailureLog;
use crate::engine::policy::{decide, Decision, RerunPolicy, ViewSet};
use crate::exec::TaskRunner;
use crate::ledger::{LedgerClient, LedgerRow};
use crate::report::take_summary;

/// Per-run settings the CLI hands down.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub policy: RerunPolicy,
    /// Lets soft-deleted rows through the deleted gate; the upsert after
    /// a successful render then clears the flag.
    pub include_deleted: bool,
}

/// What a finished run looked like.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

enum JobStatus {
    Skipped,
    Rendered,
    Failed,
    Cancelled,
}

/// Owns the job queue and drives policy → runner → classifier → ledger,
/// strictly one candidate at a time.
///
/// A failure in any single job never aborts the run; the scheduler is
/// the only layer that catches component errors, and it always advances
/// to the next candidate.
pub struct Scheduler {
    ledger: LedgerClient,
    runner: TaskRunner,
    classifier: Classifier,
    failures: FailureLog,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(
        ledger: LedgerClient,
        runner: TaskRunner,
        classifier: Classifier,
        failures: FailureLog,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            ledger,
            runner,
            classifier,
            failures,
            shutdown,
        }
    }

    /// Process `candidates` in discovery order.
    pub async fn run(
        &mut self,
        candidates: &[Candidate],
        options: SchedulerOptions,
    ) -> Result<RunStats> {
        self.failures
            .truncate()
            .context("starting a fresh failures record")?;

        let mut stats = RunStats {
            total: candidates.len(),
            ..RunStats::default()
        };

        info!(total = stats.total, policy = ?options.policy, "scheduler run started");

        for (index, candidate) in candidates.iter().enumerate() {
            if *self.shutdown.borrow() {
                info!("shutdown requested, halting queue");
                stats.cancelled = true;
                break;
            }

            info!(
                progress = format!("{}/{}", index + 1, stats.total),
                asset = %candidate.asset_id(),
                "next candidate"
            );

            let status = match self.process_candidate(candidate, options).await {
                Ok(status) => status,
                Err(e) => {
                    // Per-job fault isolation: log, record, advance.
                    error!(asset = %candidate.asset_id(), error = %e, "job failed");
                    if let Err(log_err) = self
                        .failures
                        .record(&candidate.asset_id(), &format!("PIPELINE ERROR: {e:#}"))
                    {
                        warn!(error = %log_err, "could not write failures record");
                    }
                    JobStatus::Failed
                }
            };

            match status {
                JobStatus::Skipped => stats.skipped += 1,
                JobStatus::Rendered => stats.rendered += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => {
                    stats.cancelled = true;
                    break;
                }
            }
        }

        info!(
            rendered = stats.rendered,
            skipped = stats.skipped,
            failed = stats.failed,
            cancelled = stats.cancelled,
            "scheduler run finished"
        );
        Ok(stats)
    }

    async fn process_candidate(
        &mut self,
        candidate: &Candidate,
        options: SchedulerOptions,
    ) -> Result<JobStatus> {
        let asset = candidate.asset_id();

        let row = self
            .ledger
            .find_row_map(candidate.category, &asset)
            .await
            .with_context(|| format!("looking up ledger row for '{asset}'"))?;

        let views = match decide(candidate, row.as_ref(), options.policy, options.include_deleted)
        {
            Decision::Skip(reason) => {
                info!(asset = %asset, "skip: {}", reason);
                return Ok(JobStatus::Skipped);
            }
            Decision::Run(views) => views,
        };

        let was_deleted = row.as_ref().is_some_and(|r| r.flag("deleted"));

        // The select is what makes cancellation terminate the in-flight
        // process: dropping the execute future kills the child.
        let mut shutdown = self.shutdown.clone();
        let process = tokio::select! {
            outcome = self.runner.execute(candidate, &views) => outcome?,
            _ = shutdown.changed() => {
                warn!(asset = %asset, "cancelled in-flight render");
                return Ok(JobStatus::Cancelled);
            }
        };

        let outcome = self.classifier.classify(&process);
        if !outcome.is_success() {
            self.failures.record(&asset, outcome.failure_note())?;
        }

        let payload = self
            .build_payload(candidate, &views, outcome, was_deleted && options.include_deleted)
            .await?;

        self.ledger
            .upsert(candidate.category, &payload)
            .await
            .with_context(|| format!("upserting ledger row for '{asset}'"))?;

        Ok(if outcome.is_success() {
            JobStatus::Rendered
        } else {
            JobStatus::Failed
        })
    }

    /// Assemble the upsert payload for a finished job.
    ///
    /// Summary fields are only present when the hand-off file was; an
    /// absent summary contributes nothing, so it can never blank out
    /// existing cells.
    async fn build_payload(
        &mut self,
        candidate: &Candidate,
        views: &ViewSet,
        outcome: JobOutcome,
        clear_deleted: bool,
    ) -> Result<LedgerRow> {
        let asset = candidate.asset_id();
        let (_, key_name) = self.ledger.key_column(candidate.category).await?;

        let mut payload = LedgerRow::default();
        payload.insert(key_name, asset.clone());
        payload.insert("type", candidate.category.type_value());
        payload.insert("path", candidate.source_path.to_string_lossy());
        payload.insert(
            "crashed",
            if outcome.is_success() { "No" } else { "Yes" },
        );

        if clear_deleted {
            payload.insert("deleted", "No");
        }

        if outcome.is_success() {
            payload.insert("previouslyrendered", views.to_string());
            for view in views.iter() {
                payload.insert(view.column(), "Yes");
            }
        }

        if let Some(summary) = take_summary(&candidate.output_dir, &asset) {
            if let Some(polycount) = summary.polycount {
                payload.insert("polycount", polycount.to_string());
            }
            if let Some(textures) = summary.num_textures {
                payload.insert("numberoftextures", textures.to_string());
            }
            if let Some(shaders) = summary.num_shaders {
                payload.insert("numberofshaders", shaders.to_string());
            }
            payload.insert(
                "missingtextures",
                if summary.missing_textures { "Yes" } else { "No" },
            );
        }

        Ok(payload)
    }
}
