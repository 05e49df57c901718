//! Implementation of the `recap sync` command: the orphan reconciliation
//! passes, optionally as a dry run.

use anyhow::Result;
use clap::Args;

use crate::application::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;
use crate::services::ReconcileStats;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Report what would change without mutating anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct SyncOutput {
    pub dry_run: bool,
    #[serde(flatten)]
    pub stats: ReconcileStats,
}

impl CommandOutput for SyncOutput {
    fn to_human(&self) -> String {
        let verb = if self.dry_run { "Would repair" } else { "Repaired" };
        let mut lines = vec![format!(
            "{verb} {} divergence(s):",
            self.stats.total_repairs()
        )];
        lines.push(format!("  screenshots registered: {}", self.stats.screenshots_registered));
        lines.push(format!("  notes re-indexed:       {}", self.stats.notes_reindexed));
        lines.push(format!("  orphan notes removed:   {}", self.stats.orphan_notes_removed));
        lines.push(format!("  placeholders purged:    {}", self.stats.placeholders_purged));
        if self.stats.errors > 0 {
            lines.push(format!("  skipped with errors:    {}", self.stats.errors));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: SyncArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let context = AppContext::init(config).await?;
    let reconciler = context.orphan_reconciler();

    let stats = reconciler.run_all(args.dry_run).await?;
    let errors = stats.errors;
    output(&SyncOutput { dry_run: args.dry_run, stats }, json_mode);

    if errors > 0 {
        anyhow::bail!("{errors} item(s) could not be reconciled");
    }
    Ok(())
}
