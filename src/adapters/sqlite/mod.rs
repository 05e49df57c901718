//! SQLite adapters for the datastore ports.

pub mod connection;
pub mod deletion_log_repository;
pub mod evidence_repository;
pub mod graph_repository;
pub mod job_repository;
pub mod migrations;
pub mod note_repository;

pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use deletion_log_repository::SqliteDeletionLogRepository;
pub use evidence_repository::{
    SqliteEventRepository, SqliteScreenshotRepository, SqliteTextBufferRepository,
};
pub use graph_repository::SqliteGraphRepository;
pub use job_repository::SqliteJobRepository;
pub use migrations::{all_embedded_migrations, initial_schema_migration, Migration, MigrationError, Migrator};
pub use note_repository::SqliteNoteRepository;

use sqlx::SqlitePool;

/// Create the pool and bring the schema up to date in one step.
pub async fn initialize_database(
    database_path: &str,
    config: Option<PoolConfig>,
) -> anyhow::Result<SqlitePool> {
    let pool = create_pool(database_path, config).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}
