//! Process-wide application context.
//!
//! Built once at startup from the loaded configuration and handed to every
//! component; there are no global singletons. Dropping the context tears
//! the pool down with the process.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteDeletionLogRepository, SqliteEventRepository,
    SqliteGraphRepository, SqliteJobRepository, SqliteNoteRepository, SqliteScreenshotRepository,
    SqliteTextBufferRepository,
};
use crate::adapters::summarizer::HttpSummarizer;
use crate::application::backfill::BackfillOrchestrator;
use crate::domain::calendar::{DataLayout, TraceDayCalendar};
use crate::domain::models::Config;
use crate::domain::ports::{
    DeletionLogRepository, EventRepository, GraphRepository, JobRepository, NoteRepository,
    ScreenshotRepository, Summarizer, TextBufferRepository,
};
use crate::services::{
    ArtifactCleaner, GapScanner, IntegrityChecker, OrphanReconciler, PhraseIdleClassifier,
};

pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub calendar: TraceDayCalendar,
    pub layout: DataLayout,
    pub notes: Arc<dyn NoteRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub screenshots: Arc<dyn ScreenshotRepository>,
    pub events: Arc<dyn EventRepository>,
    pub text_buffers: Arc<dyn TextBufferRepository>,
    pub graph: Arc<dyn GraphRepository>,
    pub deletion_log: Arc<dyn DeletionLogRepository>,
}

impl AppContext {
    /// Open the datastore, run migrations, and wire every repository.
    pub async fn init(config: Config) -> anyhow::Result<Self> {
        let pool_config = PoolConfig {
            max_connections: config.database.max_connections,
            ..PoolConfig::default()
        };
        let pool = initialize_database(&config.database.path, Some(pool_config)).await?;
        Ok(Self::from_pool(config, pool))
    }

    /// Wire the context over an existing pool. Tests use this with an
    /// in-memory database.
    pub fn from_pool(config: Config, pool: SqlitePool) -> Self {
        let calendar = TraceDayCalendar::new(config.revision_hour);
        let layout = DataLayout::new(config.data_dir.clone(), calendar);

        Self {
            calendar,
            layout,
            notes: Arc::new(SqliteNoteRepository::new(pool.clone())),
            jobs: Arc::new(SqliteJobRepository::new(pool.clone())),
            screenshots: Arc::new(SqliteScreenshotRepository::new(pool.clone())),
            events: Arc::new(SqliteEventRepository::new(pool.clone())),
            text_buffers: Arc::new(SqliteTextBufferRepository::new(pool.clone())),
            graph: Arc::new(SqliteGraphRepository::new(pool.clone())),
            deletion_log: Arc::new(SqliteDeletionLogRepository::new(pool.clone())),
            config,
            pool,
        }
    }

    pub fn gap_scanner(&self) -> GapScanner {
        GapScanner::new(
            Arc::clone(&self.screenshots),
            Arc::clone(&self.events),
            Arc::clone(&self.notes),
            Arc::clone(&self.jobs),
            self.layout.clone(),
            self.config.scan.clone(),
        )
    }

    pub fn orphan_reconciler(&self) -> OrphanReconciler {
        OrphanReconciler::new(
            Arc::clone(&self.screenshots),
            Arc::clone(&self.notes),
            Arc::clone(&self.jobs),
            self.layout.clone(),
        )
    }

    pub fn integrity_checker(&self) -> IntegrityChecker {
        IntegrityChecker::new(
            Arc::clone(&self.notes),
            Arc::clone(&self.graph),
            self.layout.clone(),
        )
    }

    pub fn artifact_cleaner(&self) -> ArtifactCleaner {
        ArtifactCleaner::new(
            Arc::new(self.integrity_checker()),
            Arc::clone(&self.screenshots),
            Arc::clone(&self.text_buffers),
            Arc::clone(&self.deletion_log),
            self.layout.clone(),
            self.config.cleanup.clone(),
        )
    }

    /// Orchestrator over an explicit summarizer; tests inject a scripted
    /// one here.
    pub fn backfill_orchestrator(&self, summarizer: Arc<dyn Summarizer>) -> BackfillOrchestrator {
        BackfillOrchestrator::new(
            Arc::new(self.orphan_reconciler()),
            Arc::new(self.gap_scanner()),
            Arc::clone(&self.jobs),
            summarizer,
            Arc::new(PhraseIdleClassifier),
            self.calendar,
            self.config.backfill.clone(),
        )
    }

    /// Orchestrator over the configured HTTP summarizer.
    pub fn http_backfill_orchestrator(&self) -> anyhow::Result<BackfillOrchestrator> {
        let request_timeout =
            std::time::Duration::from_secs(self.config.backfill.summarize_timeout_secs);
        let summarizer = HttpSummarizer::new(&self.config.summarizer, request_timeout)?;
        Ok(self.backfill_orchestrator(Arc::new(summarizer)))
    }
}
