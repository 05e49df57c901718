//! Implementation of the `recap status` command.

use anyhow::Result;
use clap::Args;
use std::collections::HashMap;

use crate::application::AppContext;
use crate::cli::output::{format_jobs_table, output, CommandOutput};
use crate::domain::models::{Job, JobStatus};
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show individual ledger rows instead of just counts
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    pub counts: HashMap<String, u64>,
    pub notes: i64,
    pub deletions_logged: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<Job>>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec!["Ledger:".to_string()];
        for status in [JobStatus::Pending, JobStatus::Running, JobStatus::Success, JobStatus::Failed] {
            let count = self.counts.get(status.as_str()).copied().unwrap_or(0);
            lines.push(format!("  {:<8} {count}", status.as_str()));
        }
        lines.push(format!("Notes: {}", self.notes));
        lines.push(format!("Deletion log entries: {}", self.deletions_logged));
        if let Some(jobs) = &self.jobs {
            lines.push(String::new());
            lines.push(format_jobs_table(jobs));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: StatusArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let context = AppContext::init(config).await?;

    let counts = context
        .jobs
        .count_by_status()
        .await?
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();
    let notes = context.notes.count(None).await?;
    let deletions_logged = context.deletion_log.list().await?.len();
    let jobs = if args.verbose {
        Some(context.jobs.list(None).await?)
    } else {
        None
    };

    output(
        &StatusOutput {
            counts,
            notes,
            deletions_logged,
            jobs,
        },
        json_mode,
    );
    Ok(())
}
