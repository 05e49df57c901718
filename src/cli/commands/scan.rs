//! Implementation of the `recap scan` command. Report-only: no repair, no
//! claims, no mutation of any kind.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;

use crate::application::AppContext;
use crate::cli::output::{format_missing_days_table, format_missing_hours_table, output, CommandOutput};
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Also report trace days missing their day note
    #[arg(long)]
    pub days: bool,

    /// Re-offer windows the ledger already settled as success
    #[arg(long)]
    pub ignore_ledger: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct ScanOutput {
    pub missing_hours: Vec<DateTime<Utc>>,
    pub missing_days: Option<Vec<NaiveDate>>,
}

impl CommandOutput for ScanOutput {
    fn to_human(&self) -> String {
        let mut sections = Vec::new();
        if self.missing_hours.is_empty() {
            sections.push("No missing hours.".to_string());
        } else {
            sections.push(format_missing_hours_table(&self.missing_hours));
            sections.push(format!("{} missing hour(s)", self.missing_hours.len()));
        }
        if let Some(days) = &self.missing_days {
            if days.is_empty() {
                sections.push("No missing day notes.".to_string());
            } else {
                sections.push(format_missing_days_table(days));
                sections.push(format!("{} missing day note(s)", days.len()));
            }
        }
        sections.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ScanArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let context = AppContext::init(config).await?;
    let scanner = context.gap_scanner();

    let now = Utc::now();
    let missing_hours = scanner.find_missing_hours(now, args.ignore_ledger).await?;
    let missing_days = if args.days {
        Some(scanner.find_missing_days(now).await?)
    } else {
        None
    };

    output(&ScanOutput { missing_hours, missing_days }, json_mode);
    Ok(())
}
