//! Implementation of the `recap cleanup` command.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use console::style;

use crate::application::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::ArtifactKind;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{CleanupOutcome, CleanupStats};

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Trace day to clean (YYYY-MM-DD)
    pub day: NaiveDate,

    /// Skip the integrity checkpoint (recorded in the deletion log)
    #[arg(long)]
    pub force: bool,

    /// Count everything but delete nothing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct CleanupOutput {
    pub day: NaiveDate,
    #[serde(flatten)]
    pub stats: CleanupStats,
}

impl CommandOutput for CleanupOutput {
    fn to_human(&self) -> String {
        let verb = if self.stats.dry_run { "Would delete" } else { "Deleted" };
        let mut lines = vec![format!(
            "{verb} {} file(s), {} byte(s) for {}:",
            self.stats.total_files(),
            self.stats.total_bytes(),
            self.day
        )];
        for kind in ArtifactKind::all() {
            let k = self.stats.kind(kind);
            lines.push(format!(
                "  {:<12} {} file(s), {} byte(s), {} row(s)",
                kind.as_str(),
                k.files_deleted,
                k.bytes_deleted,
                k.rows_deleted
            ));
        }
        if self.stats.dirs_pruned > 0 {
            lines.push(format!("  pruned {} empty director(ies)", self.stats.dirs_pruned));
        }
        if !self.stats.integrity_passed {
            lines.push(format!(
                "  {} integrity checkpoint was bypassed",
                style("warning:").yellow()
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: CleanupArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let context = AppContext::init(config).await?;
    let cleaner = context.artifact_cleaner();

    match cleaner.cleanup(args.day, args.force, args.dry_run).await? {
        CleanupOutcome::Done(stats) => {
            output(&CleanupOutput { day: args.day, stats }, json_mode);
            Ok(())
        }
        CleanupOutcome::Blocked(report) => {
            // The operator gets the specific error list, never a bare
            // "failed".
            if json_mode {
                let payload = serde_json::json!({
                    "success": false,
                    "day": args.day,
                    "errors": report.errors,
                    "warnings": report.warnings,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                eprintln!(
                    "{} integrity checkpoint failed for {}; nothing was deleted:",
                    style("fail:").red().bold(),
                    args.day
                );
                for error in &report.errors {
                    eprintln!("  {} {error}", style("error:").red());
                }
            }
            anyhow::bail!("cleanup blocked by the integrity checkpoint")
        }
    }
}
