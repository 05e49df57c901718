//! SQLite implementation of the NoteRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Note, NoteType};
use crate::domain::ports::NoteRepository;

#[derive(Clone)]
pub struct SqliteNoteRepository {
    pool: SqlitePool,
}

impl SqliteNoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    async fn upsert(&self, note: &Note) -> DomainResult<()> {
        let payload = serde_json::to_string(&note.json_payload)?;

        sqlx::query(
            r#"INSERT INTO notes (id, note_type, start_ts, end_ts, file_path, json_payload,
               embedding_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (note_type, start_ts) DO UPDATE SET
                   id = excluded.id,
                   end_ts = excluded.end_ts,
                   file_path = excluded.file_path,
                   json_payload = excluded.json_payload,
                   embedding_id = excluded.embedding_id,
                   updated_at = excluded.updated_at"#,
        )
        .bind(note.id.to_string())
        .bind(note.note_type.as_str())
        .bind(note.start_ts.to_rfc3339())
        .bind(note.end_ts.to_rfc3339())
        .bind(&note.file_path)
        .bind(&payload)
        .bind(note.embedding_id.map(|id| id.to_string()))
        .bind(note.created_at.to_rfc3339())
        .bind(note.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Note>> {
        let row: Option<NoteRow> = sqlx::query_as("SELECT * FROM notes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_window(
        &self,
        note_type: NoteType,
        start_ts: DateTime<Utc>,
    ) -> DomainResult<Option<Note>> {
        let row: Option<NoteRow> =
            sqlx::query_as("SELECT * FROM notes WHERE note_type = ? AND start_ts = ?")
                .bind(note_type.as_str())
                .bind(start_ts.to_rfc3339())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, note_type: Option<NoteType>) -> DomainResult<Vec<Note>> {
        let rows: Vec<NoteRow> = match note_type {
            Some(t) => {
                sqlx::query_as("SELECT * FROM notes WHERE note_type = ? ORDER BY start_ts")
                    .bind(t.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM notes ORDER BY start_ts")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_in_range(
        &self,
        note_type: NoteType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Note>> {
        let rows: Vec<NoteRow> = sqlx::query_as(
            r#"SELECT * FROM notes
               WHERE note_type = ? AND start_ts >= ? AND start_ts < ?
               ORDER BY start_ts"#,
        )
        .bind(note_type.as_str())
        .bind(start.to_rfc3339())
        .bind(end.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self, note_type: Option<NoteType>) -> DomainResult<i64> {
        let result: (i64,) = match note_type {
            Some(t) => {
                sqlx::query_as("SELECT COUNT(*) FROM notes WHERE note_type = ?")
                    .bind(t.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM notes")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(result.0)
    }

    async fn window_starts(&self, note_type: NoteType) -> DomainResult<Vec<DateTime<Utc>>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT start_ts FROM notes WHERE note_type = ? ORDER BY start_ts")
                .bind(note_type.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|(ts,)| parse_ts(&ts)).collect()
    }

    async fn delete_with_dependents(&self, id: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        let id_str = id.to_string();

        sqlx::query("DELETE FROM note_entities WHERE note_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM embeddings WHERE note_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NoteNotFound(id));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: String,
    note_type: String,
    start_ts: String,
    end_ts: String,
    file_path: String,
    json_payload: String,
    embedding_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn parse_ts(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

impl TryFrom<NoteRow> for Note {
    type Error = DomainError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let note_type = NoteType::from_str(&row.note_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid note type: {}", row.note_type))
        })?;

        let embedding_id = row
            .embedding_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(Note {
            id,
            note_type,
            start_ts: parse_ts(&row.start_ts)?,
            end_ts: parse_ts(&row.end_ts)?,
            file_path: row.file_path,
            json_payload: serde_json::from_str(&row.json_payload)?,
            embedding_id,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};
    use chrono::TimeZone;
    use serde_json::json;

    async fn setup_test_repo() -> SqliteNoteRepository {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        SqliteNoteRepository::new(pool)
    }

    fn hour_note(hour: u32) -> Note {
        let start = Utc.with_ymd_and_hms(2026, 1, 29, hour, 0, 0).unwrap();
        Note::new(
            NoteType::Hour,
            start,
            start + chrono::Duration::hours(1),
            format!("/data/notes/2026-01-29/hour_{hour:02}.md"),
            json!({"summary": "worked", "activities": [{"title": "editing"}]}),
        )
    }

    #[tokio::test]
    async fn upsert_and_get_by_window() {
        let repo = setup_test_repo().await;
        let note = hour_note(9);

        repo.upsert(&note).await.unwrap();

        let found = repo
            .get_by_window(NoteType::Hour, note.start_ts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, note.id);
        assert_eq!(found.json_payload, note.json_payload);

        // Upsert for the same window replaces rather than duplicating.
        let mut revised = hour_note(9);
        revised.file_path = "/data/notes/2026-01-29/hour_09_v2.md".to_string();
        repo.upsert(&revised).await.unwrap();

        assert_eq!(repo.count(Some(NoteType::Hour)).await.unwrap(), 1);
        let found = repo
            .get_by_window(NoteType::Hour, note.start_ts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, revised.id);
        assert_eq!(found.file_path, revised.file_path);
    }

    #[tokio::test]
    async fn list_in_range_is_half_open() {
        let repo = setup_test_repo().await;
        for hour in [8, 9, 10] {
            repo.upsert(&hour_note(hour)).await.unwrap();
        }

        let start = Utc.with_ymd_and_hms(2026, 1, 29, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 29, 10, 0, 0).unwrap();
        let notes = repo.list_in_range(NoteType::Hour, start, end).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.start_ts < end));
    }

    #[tokio::test]
    async fn delete_with_dependents_removes_links_and_embeddings() {
        let repo = setup_test_repo().await;
        let note = hour_note(9);
        repo.upsert(&note).await.unwrap();

        let pool = repo.pool.clone();
        sqlx::query("INSERT INTO note_entities (note_id, entity_id) VALUES (?, ?)")
            .bind(note.id.to_string())
            .bind(Uuid::new_v4().to_string())
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO embeddings (id, note_id, dim, vector, created_at) VALUES (?, ?, 8, NULL, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(note.id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();

        repo.delete_with_dependents(note.id).await.unwrap();

        let links: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM note_entities")
            .fetch_one(&pool)
            .await
            .unwrap();
        let embeddings: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links.0, 0);
        assert_eq!(embeddings.0, 0);
        assert!(repo.get(note.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_note_errors() {
        let repo = setup_test_repo().await;
        let err = repo.delete_with_dependents(Uuid::new_v4()).await;
        assert!(matches!(err, Err(DomainError::NoteNotFound(_))));
    }
}
