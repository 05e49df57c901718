//! Implementation of the `recap integrity` command.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use console::style;

use crate::application::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;
use crate::services::IntegrityReport;

#[derive(Args, Debug)]
pub struct IntegrityArgs {
    #[command(subcommand)]
    pub command: IntegrityCommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum IntegrityCommand {
    /// Validate one trace day's notes, links, and edges
    Check {
        /// Trace day to check (YYYY-MM-DD)
        day: NaiveDate,

        /// Treat missing embeddings as errors
        #[arg(long)]
        require_embeddings: bool,

        /// Treat a missing day note as an error
        #[arg(long)]
        require_day_note: bool,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct IntegrityOutput {
    pub day: NaiveDate,
    pub passed: bool,
    #[serde(flatten)]
    pub report: IntegrityReport,
}

impl CommandOutput for IntegrityOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.passed {
            lines.push(format!("{} integrity check passed for {}", style("ok:").green().bold(), self.day));
        } else {
            lines.push(format!(
                "{} integrity check failed for {} with {} error(s)",
                style("fail:").red().bold(),
                self.day,
                self.report.errors.len()
            ));
        }
        for error in &self.report.errors {
            lines.push(format!("  {} {error}", style("error:").red()));
        }
        for warning in &self.report.warnings {
            lines.push(format!("  {} {warning}", style("warning:").yellow()));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: IntegrityArgs, json_mode: bool) -> Result<()> {
    let IntegrityCommand::Check {
        day,
        require_embeddings,
        require_day_note,
    } = args.command;

    let config = ConfigLoader::load()?;
    let context = AppContext::init(config).await?;
    let checker = context.integrity_checker();

    let report = checker.check(day, require_embeddings, require_day_note).await?;
    let passed = report.passed();

    output(&IntegrityOutput { day, passed, report }, json_mode);

    if !passed {
        anyhow::bail!("integrity check reported errors for {day}");
    }
    Ok(())
}
