// src/lib.rs

pub mod candidate;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod ledger;
pub mod logging;
pub mod report;

use std::path::Path;

use anyhow::{anyhow, Result};
use tokio::sync::watch;
use tracing::info;

use crate::candidate::{discover, Candidate};
use crate::catalog::{reconcile, upload_batch, HttpCatalog};
use crate::cli::{CliArgs, Command};
use crate::config::loader::load_or_default;
use crate::config::ConfigFile;
use crate::engine::{Classifier, FailureLog, RerunPolicy, Scheduler, SchedulerOptions};
use crate::exec::TaskRunner;
use crate::ledger::{HttpLedgerTransport, LedgerClient};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the ledger/catalog clients
/// - the scheduler, runner and classifier
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(Path::new(&args.config))?;

    match args.command {
        Command::Render {
            scenes,
            output,
            category,
            policy,
            include_deleted,
            dry_run,
        } => {
            let candidates = discover(&scenes, &cfg.render.scene_suffix, &output, category)?;
            if candidates.is_empty() {
                return Err(anyhow!(
                    "no scene files ending in '{}' found under {:?}",
                    cfg.render.scene_suffix,
                    scenes
                ));
            }

            if dry_run {
                print_dry_run(&cfg, &candidates, policy);
                return Ok(());
            }

            run_render(&cfg, &candidates, policy, include_deleted).await
        }

        Command::Delete { terms } => {
            let catalog = HttpCatalog::new(cfg.catalog.base_url.clone());
            let mut ledger = build_ledger(&cfg);

            let report = reconcile(&catalog, &mut ledger, &terms).await?;

            info!(
                trashed = report.trashed.len(),
                marked = report.marked.len(),
                failures = report.mark_failures.len(),
                "reconciliation finished"
            );
            if let Some(err) = &report.trash_error {
                info!("catalog trash call failed: {err}");
            }
            for (asset, reason) in &report.mark_failures {
                info!(asset = %asset, "could not mark deleted: {}", reason);
            }
            Ok(())
        }

        Command::Upload { category, batch } => {
            let folder_id = cfg.catalog.folders.get(&category).ok_or_else(|| {
                anyhow!(
                    "no [catalog.folders] entry for category '{}'",
                    category.type_value()
                )
            })?;

            let catalog = HttpCatalog::new(cfg.catalog.base_url.clone());
            let report = upload_batch(&catalog, category, folder_id, &batch).await?;

            info!(
                uploaded = report.uploaded,
                trashed = report.trashed,
                skipped = report.skipped,
                failed = report.failed,
                "upload finished"
            );
            Ok(())
        }
    }
}

async fn run_render(
    cfg: &ConfigFile,
    candidates: &[Candidate],
    policy: RerunPolicy,
    include_deleted: bool,
) -> Result<()> {
    let ledger = build_ledger(cfg);
    let runner = TaskRunner::from_config(&cfg.render);
    let classifier = Classifier::new(cfg.classifier.clone());
    let failures = FailureLog::new(cfg.run.failures_log.clone());

    // Ctrl-C → graceful shutdown. The scheduler watches the flag between
    // jobs and races it against the in-flight process.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(true);
    });

    let mut scheduler = Scheduler::new(ledger, runner, classifier, failures, shutdown_rx);
    let stats = scheduler
        .run(
            candidates,
            SchedulerOptions {
                policy,
                include_deleted,
            },
        )
        .await?;

    if stats.failed > 0 {
        info!(
            failed = stats.failed,
            log = %cfg.run.failures_log.display(),
            "some jobs failed; see the failures record"
        );
    }
    Ok(())
}

fn build_ledger(cfg: &ConfigFile) -> LedgerClient {
    let transport = HttpLedgerTransport::new(cfg.ledger.base_url.clone());
    LedgerClient::new(Box::new(transport), &cfg.ledger)
}

/// Simple dry-run output: print settings and the discovered queue.
fn print_dry_run(cfg: &ConfigFile, candidates: &[Candidate], policy: RerunPolicy) {
    println!("previewpipe dry-run");
    println!("  render.command = {}", cfg.render.command);
    println!("  render.args = {:?}", cfg.render.args);
    if let Some(secs) = cfg.render.timeout_secs {
        println!("  render.timeout_secs = {secs}");
    }
    println!("  policy = {policy:?}");
    println!();

    println!("candidates ({}):", candidates.len());
    for c in candidates {
        println!("  - {} ({})", c.asset_id(), c.source_path.display());
    }
}
