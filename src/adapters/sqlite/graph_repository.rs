//! SQLite implementation of the GraphRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Edge, Embedding, Entity};
use crate::domain::ports::GraphRepository;

#[derive(Clone)]
pub struct SqliteGraphRepository {
    pool: SqlitePool,
}

impl SqliteGraphRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(e.to_string()))
}

#[async_trait]
impl GraphRepository for SqliteGraphRepository {
    async fn insert_entity(&self, entity: &Entity) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO entities (id, name, kind, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(entity.id.to_string())
        .bind(&entity.name)
        .bind(&entity.kind)
        .bind(entity.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_edge(&self, edge: &Edge) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO edges (id, source_id, target_id, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(edge.id.to_string())
        .bind(edge.source_id.to_string())
        .bind(edge.target_id.to_string())
        .bind(&edge.kind)
        .bind(edge.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn link_note_entity(&self, note_id: Uuid, entity_id: Uuid) -> DomainResult<()> {
        sqlx::query("INSERT OR IGNORE INTO note_entities (note_id, entity_id) VALUES (?, ?)")
            .bind(note_id.to_string())
            .bind(entity_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_embedding(&self, embedding: &Embedding) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO embeddings (id, note_id, dim, vector, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(embedding.id.to_string())
        .bind(embedding.note_id.to_string())
        .bind(i64::from(embedding.dim))
        .bind(embedding.vector.as_deref())
        .bind(embedding.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entity_exists(&self, id: Uuid) -> DomainResult<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    async fn embedding_exists(&self, id: Uuid) -> DomainResult<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM embeddings WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    async fn entity_ids_for_note(&self, note_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT entity_id FROM note_entities WHERE note_id = ?")
                .bind(note_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|(id,)| parse_uuid(&id)).collect()
    }

    async fn edges_touching(&self, entity_ids: &[Uuid]) -> DomainResult<Vec<Edge>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; entity_ids.len()].join(", ");
        let query = format!(
            "SELECT * FROM edges WHERE source_id IN ({placeholders}) OR target_id IN ({placeholders})"
        );

        let mut q = sqlx::query_as::<_, EdgeRow>(&query);
        for _ in 0..2 {
            for id in entity_ids {
                q = q.bind(id.to_string());
            }
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct EdgeRow {
    id: String,
    source_id: String,
    target_id: String,
    kind: String,
    created_at: String,
}

impl TryFrom<EdgeRow> for Edge {
    type Error = DomainError;

    fn try_from(row: EdgeRow) -> Result<Self, Self::Error> {
        Ok(Edge {
            id: parse_uuid(&row.id)?,
            source_id: parse_uuid(&row.source_id)?,
            target_id: parse_uuid(&row.target_id)?,
            kind: row.kind,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| DomainError::SerializationError(e.to_string()))?,
        })
    }
}
