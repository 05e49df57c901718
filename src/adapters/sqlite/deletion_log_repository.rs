//! SQLite implementation of the append-only deletion audit log.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArtifactKind, DeletionLogEntry};
use crate::domain::ports::DeletionLogRepository;

#[derive(Clone)]
pub struct SqliteDeletionLogRepository {
    pool: SqlitePool,
}

impl SqliteDeletionLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeletionLogRepository for SqliteDeletionLogRepository {
    async fn append(&self, entry: &DeletionLogEntry) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO deletion_log (id, deleted_on, artifact_kind, files_deleted,
               bytes_deleted, rows_deleted, integrity_passed, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(entry.deleted_on.format("%Y-%m-%d").to_string())
        .bind(entry.artifact_kind.as_str())
        .bind(i64::try_from(entry.files_deleted).unwrap_or(i64::MAX))
        .bind(i64::try_from(entry.bytes_deleted).unwrap_or(i64::MAX))
        .bind(i64::try_from(entry.rows_deleted).unwrap_or(i64::MAX))
        .bind(entry.integrity_passed)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<DeletionLogEntry>> {
        let rows: Vec<DeletionLogRow> =
            sqlx::query_as("SELECT * FROM deletion_log ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct DeletionLogRow {
    id: String,
    deleted_on: String,
    artifact_kind: String,
    files_deleted: i64,
    bytes_deleted: i64,
    rows_deleted: i64,
    integrity_passed: bool,
    created_at: String,
}

impl TryFrom<DeletionLogRow> for DeletionLogEntry {
    type Error = DomainError;

    fn try_from(row: DeletionLogRow) -> Result<Self, Self::Error> {
        let artifact_kind = match row.artifact_kind.as_str() {
            "screenshots" => ArtifactKind::Screenshots,
            "text" => ArtifactKind::TextBuffers,
            "ocr" => ArtifactKind::OcrText,
            other => {
                return Err(DomainError::SerializationError(format!(
                    "Unknown artifact kind: {other}"
                )))
            }
        };

        Ok(DeletionLogEntry {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| DomainError::SerializationError(e.to_string()))?,
            deleted_on: NaiveDate::parse_from_str(&row.deleted_on, "%Y-%m-%d")
                .map_err(|e| DomainError::SerializationError(e.to_string()))?,
            artifact_kind,
            files_deleted: u64::try_from(row.files_deleted).unwrap_or(0),
            bytes_deleted: u64::try_from(row.bytes_deleted).unwrap_or(0),
            rows_deleted: u64::try_from(row.rows_deleted).unwrap_or(0),
            integrity_passed: row.integrity_passed,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| DomainError::SerializationError(e.to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};

    #[tokio::test]
    async fn append_and_list_preserves_order_and_fields() {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        let repo = SqliteDeletionLogRepository::new(pool);

        let day = NaiveDate::from_ymd_opt(2026, 1, 28).unwrap();
        let first = DeletionLogEntry::new(day, ArtifactKind::Screenshots, 120, 4_800_000, 120, true);
        let second = DeletionLogEntry::new(day, ArtifactKind::OcrText, 12, 30_000, 0, true);
        repo.append(&first).await.unwrap();
        repo.append(&second).await.unwrap();

        let entries = repo.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].artifact_kind, ArtifactKind::Screenshots);
        assert_eq!(entries[0].files_deleted, 120);
        assert!(entries[0].integrity_passed);
        assert_eq!(entries[1].artifact_kind, ArtifactKind::OcrText);
        assert_eq!(entries[1].deleted_on, day);
    }
}
