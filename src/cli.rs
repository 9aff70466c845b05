// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::candidate::Category;
use crate::engine::RerunPolicy;

/// Command-line arguments for `previewpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "previewpipe",
    version,
    about = "Batch-render asset previews and reconcile the shared ledger and catalog.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Previewpipe.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Previewpipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PREVIEWPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scan a scene folder and render previews for the candidates the
    /// rerun policy selects.
    Render {
        /// Folder containing authored scene files (scanned recursively).
        scenes: PathBuf,

        /// Directory the render task writes images and hand-off files to.
        #[arg(long, value_name = "DIR")]
        output: PathBuf,

        /// Asset category for this run (one ledger tab per category).
        #[arg(long, value_enum)]
        category: Category,

        /// Which candidates to (re)process.
        #[arg(long, value_enum, default_value = "new-only")]
        policy: RerunPolicy,

        /// Render soft-deleted assets anyway and clear their deleted flag.
        #[arg(long)]
        include_deleted: bool,

        /// List candidates and settings, but don't execute anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve free-text terms against the catalog, trash the matches
    /// and mark their ledger rows deleted.
    Delete {
        /// Asset ids, file paths, or (partial) catalog item names.
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Upload a per-category result batch file into the catalog.
    Upload {
        /// Category whose entries to upload (determines the catalog folder).
        #[arg(long, value_enum)]
        category: Category,

        /// Result batch file to upload.
        #[arg(long, value_name = "PATH", env = "PREVIEWPIPE_BATCH_FILE")]
        batch: PathBuf,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
