//! CLI output plumbing: human/JSON dual rendering and table formatting.

use chrono::{DateTime, NaiveDate, Utc};
use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::models::Job;

/// Dual rendering for command results. Every command builds one output
/// struct and pushes it through `output` so `--json` stays lossless.
pub trait CommandOutput {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output(data: &impl CommandOutput, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&data.to_json()).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("{}", data.to_human());
    }
}

pub fn handle_error(err: anyhow::Error, json_mode: bool) {
    if json_mode {
        let payload = serde_json::json!({"success": false, "error": format!("{err:#}")});
        eprintln!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", style("error:").red().bold());
    }
    std::process::exit(1);
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn format_missing_hours_table(hours: &[DateTime<Utc>]) -> String {
    let mut table = base_table();
    table.set_header(vec![
        Cell::new("Missing hour (UTC)").add_attribute(Attribute::Bold),
    ]);
    for hour in hours {
        table.add_row(vec![Cell::new(hour.format("%Y-%m-%d %H:00"))]);
    }
    table.to_string()
}

pub fn format_missing_days_table(days: &[NaiveDate]) -> String {
    let mut table = base_table();
    table.set_header(vec![
        Cell::new("Missing trace day").add_attribute(Attribute::Bold),
    ]);
    for day in days {
        table.add_row(vec![Cell::new(day.format("%Y-%m-%d"))]);
    }
    table.to_string()
}

pub fn format_jobs_table(jobs: &[Job]) -> String {
    let mut table = base_table();
    table.set_header(vec![
        Cell::new("Type").add_attribute(Attribute::Bold),
        Cell::new("Window start").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Attempts").add_attribute(Attribute::Bold),
        Cell::new("Last error").add_attribute(Attribute::Bold),
    ]);
    for job in jobs {
        table.add_row(vec![
            Cell::new(job.job_type.as_str()),
            Cell::new(job.window_start.format("%Y-%m-%d %H:00")),
            Cell::new(job.status.as_str()),
            Cell::new(job.attempts),
            Cell::new(truncate(job.last_error.as_deref().unwrap_or("-"), 48)),
        ]);
    }
    table.to_string()
}

pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    spinner
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_len).collect();
        format!("{cut}...")
    }
}
