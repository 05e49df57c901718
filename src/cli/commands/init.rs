//! Implementation of the `recap init` command.

use anyhow::{Context as _, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ArtifactKind, Config};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.database_initialized {
            lines.push("\nDatabase initialized at .recap/recap.db".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let recap_dir = target_path.join(".recap");

    if recap_dir.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            directories_created: vec![],
            database_initialized: false,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    if args.force && recap_dir.exists() {
        std::fs::remove_dir_all(&recap_dir).context("Failed to remove existing .recap directory")?;
    }

    let config = Config::default();
    let data_dir = resolve(&target_path, &config.data_dir);

    let mut dirs = vec![recap_dir.clone(), data_dir.join("notes")];
    for kind in ArtifactKind::all() {
        dirs.push(data_dir.join("cache").join(kind.as_str()));
    }

    let mut directories_created = vec![];
    for dir in &dirs {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        directories_created.push(dir.display().to_string());
    }

    let config_path = recap_dir.join("config.yaml");
    let rendered = serde_yaml::to_string(&config).context("Failed to render default config")?;
    std::fs::write(&config_path, rendered)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let db_path = resolve(&target_path, &config.database.path);
    let pool = initialize_database(&db_path.to_string_lossy(), None)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    let output_data = InitOutput {
        success: true,
        message: "Initialized recap project.".to_string(),
        initialized_path: target_path,
        directories_created,
        database_initialized: true,
    };
    output(&output_data, json_mode);
    Ok(())
}

fn resolve(base: &Path, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
