//! Implementation of the `recap backfill` command.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use std::sync::atomic::Ordering;

use crate::application::{AppContext, BackfillReport};
use crate::cli::output::{create_spinner, output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Reprocess settled windows and bypass the summarizer's idle heuristics
    #[arg(long)]
    pub force: bool,

    /// Maximum windows to process this run
    #[arg(long)]
    pub max: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub struct BackfillOutput {
    #[serde(flatten)]
    pub report: BackfillReport,
}

impl CommandOutput for BackfillOutput {
    fn to_human(&self) -> String {
        let r = &self.report;
        let mut lines = vec![format!(
            "Processed {} window(s): {} note(s), {} idle, {} failed.",
            r.processed, r.notes_produced, r.skipped_idle, r.failed
        )];
        if r.skipped > 0 {
            lines.push(format!("Skipped {} window(s) owned or settled elsewhere.", r.skipped));
        }
        if r.remaining > 0 {
            lines.push(format!("{} window(s) left for the next run.", r.remaining));
        }
        if r.reconcile.total_repairs() > 0 {
            lines.push(format!(
                "Reconciliation: {} screenshot(s) registered, {} note(s) re-indexed, {} orphan(s) removed, {} placeholder(s) purged.",
                r.reconcile.screenshots_registered,
                r.reconcile.notes_reindexed,
                r.reconcile.orphan_notes_removed,
                r.reconcile.placeholders_purged
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: BackfillArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let context = AppContext::init(config).await?;
    let orchestrator = context.http_backfill_orchestrator()?;

    // Ctrl-C requests a cooperative stop; the current window still settles.
    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    let spinner = (!json_mode).then(|| create_spinner("processing missing windows"));
    let report = orchestrator.run(Utc::now(), args.force, args.max).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = report?;

    let failed = report.failed;
    output(&BackfillOutput { report }, json_mode);

    if failed > 0 {
        anyhow::bail!("{failed} window(s) failed; they will be retried on the next scan");
    }
    Ok(())
}
