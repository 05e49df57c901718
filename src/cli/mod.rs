//! Command-line interface.

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

pub use output::handle_error;

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Recap - activity ledger reconciliation engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize recap configuration and database
    Init(commands::init::InitArgs),

    /// Report missing windows without mutating anything
    Scan(commands::scan::ScanArgs),

    /// Reconcile, scan, and process missing windows through the summarizer
    Backfill(commands::backfill::BackfillArgs),

    /// Run the orphan reconciliation passes
    Sync(commands::sync::SyncArgs),

    /// Run the integrity checkpoint for one trace day
    Integrity(commands::integrity::IntegrityArgs),

    /// Delete a trace day's raw caches behind the integrity checkpoint
    Cleanup(commands::cleanup::CleanupArgs),

    /// Show ledger counts and recent deletions
    Status(commands::status::StatusArgs),
}
