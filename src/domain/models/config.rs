use serde::{Deserialize, Serialize};

/// Main configuration structure for recap
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Root directory for notes and raw caches
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Hour (0-23) at which a trace day rolls over
    #[serde(default = "default_revision_hour")]
    pub revision_hour: u32,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Gap scan configuration
    #[serde(default)]
    pub scan: ScanConfig,

    /// Backfill orchestration configuration
    #[serde(default)]
    pub backfill: BackfillConfig,

    /// Summarizer service configuration
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Cleanup / integrity configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

fn default_data_dir() -> String {
    ".recap/data".to_string()
}

const fn default_revision_hour() -> u32 {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            revision_hour: default_revision_hour(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            scan: ScanConfig::default(),
            backfill: BackfillConfig::default(),
            summarizer: SummarizerConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".recap/recap.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Gap scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanConfig {
    /// Minimum on-disk screenshot files for an hour to count as activity
    #[serde(default = "default_min_screenshot_files")]
    pub min_screenshot_files: usize,

    /// Minimum combined screenshot+event count for an hour to count as activity
    #[serde(default = "default_min_combined_evidence")]
    pub min_combined_evidence: usize,
}

const fn default_min_screenshot_files() -> usize {
    3
}

const fn default_min_combined_evidence() -> usize {
    5
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_screenshot_files: default_min_screenshot_files(),
            min_combined_evidence: default_min_combined_evidence(),
        }
    }
}

/// Backfill orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackfillConfig {
    /// Maximum windows one run processes before leaving the rest for later
    #[serde(default = "default_max_windows_per_run")]
    pub max_windows_per_run: usize,

    /// Timeout for a single summarizer call, in seconds
    #[serde(default = "default_summarize_timeout_secs")]
    pub summarize_timeout_secs: u64,

    /// Running rows older than this are swept back to pending on startup
    #[serde(default = "default_stale_running_minutes")]
    pub stale_running_minutes: i64,
}

const fn default_max_windows_per_run() -> usize {
    10
}

const fn default_summarize_timeout_secs() -> u64 {
    120
}

const fn default_stale_running_minutes() -> i64 {
    60
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            max_windows_per_run: default_max_windows_per_run(),
            summarize_timeout_secs: default_summarize_timeout_secs(),
            stale_running_minutes: default_stale_running_minutes(),
        }
    }
}

/// Summarizer service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SummarizerConfig {
    /// Endpoint of the summarization service
    #[serde(default = "default_summarizer_endpoint")]
    pub endpoint: String,

    /// Bearer token (can also be set via RECAP_SUMMARIZER__API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_summarizer_endpoint() -> String {
    "http://127.0.0.1:8787/summarize".to_string()
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_summarizer_endpoint(),
            api_key: None,
        }
    }
}

/// Cleanup / integrity configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct CleanupConfig {
    /// Treat missing embeddings as integrity errors instead of warnings
    #[serde(default)]
    pub require_embeddings: bool,

    /// Treat a missing day note as an integrity error instead of a warning
    #[serde(default)]
    pub require_day_note: bool,
}
