use anyhow::{Context as _, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid revision_hour: {0}. Must be between 0 and 23")]
    InvalidRevisionHour(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Data directory cannot be empty")]
    EmptyDataDir,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_windows_per_run: {0}. Must be at least 1")]
    InvalidMaxWindows(usize),

    #[error("Invalid summarize_timeout_secs: {0}. Must be at least 1")]
    InvalidSummarizeTimeout(u64),

    #[error("Invalid evidence thresholds: min_screenshot_files ({0}) must not exceed min_combined_evidence ({1})")]
    InvalidEvidenceThresholds(usize, usize),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .recap/config.yaml (project config, created by init)
    /// 3. .recap/local.yaml (local overrides, optional)
    /// 4. Environment variables (RECAP_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".recap/config.yaml"))
            .merge(Yaml::file(".recap/local.yaml"))
            .merge(Env::prefixed("RECAP_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.revision_hour > 23 {
            return Err(ConfigError::InvalidRevisionHour(config.revision_hour));
        }

        if config.data_dir.is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.backfill.max_windows_per_run == 0 {
            return Err(ConfigError::InvalidMaxWindows(
                config.backfill.max_windows_per_run,
            ));
        }

        if config.backfill.summarize_timeout_secs == 0 {
            return Err(ConfigError::InvalidSummarizeTimeout(
                config.backfill.summarize_timeout_secs,
            ));
        }

        if config.scan.min_screenshot_files > config.scan.min_combined_evidence {
            return Err(ConfigError::InvalidEvidenceThresholds(
                config.scan.min_screenshot_files,
                config.scan.min_combined_evidence,
            ));
        }

        Ok(())
    }
}
