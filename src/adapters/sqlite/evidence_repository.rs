//! SQLite implementations of the evidence repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Event, Screenshot, TextBuffer};
use crate::domain::ports::{EventRepository, ScreenshotRepository, TextBufferRepository};

fn parse_ts(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

/// Distinct hour-starts of a timestamp column, computed in SQL so the scan
/// never pulls full evidence rows.
async fn distinct_hours_of(pool: &SqlitePool, table: &str) -> DomainResult<Vec<DateTime<Utc>>> {
    let query = format!(
        "SELECT DISTINCT strftime('%Y-%m-%dT%H:00:00+00:00', ts) FROM {table} ORDER BY 1"
    );
    let rows: Vec<(String,)> = sqlx::query_as(&query).fetch_all(pool).await?;
    rows.into_iter().map(|(ts,)| parse_ts(&ts)).collect()
}

#[derive(Clone)]
pub struct SqliteScreenshotRepository {
    pool: SqlitePool,
}

impl SqliteScreenshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScreenshotRepository for SqliteScreenshotRepository {
    async fn insert(&self, screenshot: &Screenshot) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO screenshots (id, ts, monitor_id, path, fingerprint, diff_score, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(screenshot.id.to_string())
        .bind(screenshot.ts.to_rfc3339())
        .bind(&screenshot.monitor_id)
        .bind(&screenshot.path)
        .bind(&screenshot.fingerprint)
        .bind(screenshot.diff_score)
        .bind(screenshot.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn distinct_hours(&self) -> DomainResult<Vec<DateTime<Utc>>> {
        distinct_hours_of(&self.pool, "screenshots").await
    }

    async fn count_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM screenshots WHERE ts >= ? AND ts < ?")
                .bind(start.to_rfc3339())
                .bind(end.to_rfc3339())
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    async fn paths_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT path FROM screenshots WHERE ts >= ? AND ts < ?")
                .bind(start.to_rfc3339())
                .bind(end.to_rfc3339())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    async fn delete_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM screenshots WHERE ts >= ? AND ts < ?")
            .bind(start.to_rfc3339())
            .bind(end.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn insert(&self, event: &Event) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO events (id, ts, kind, app_name, window_title, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(event.id.to_string())
        .bind(event.ts.to_rfc3339())
        .bind(&event.kind)
        .bind(&event.app_name)
        .bind(&event.window_title)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn distinct_hours(&self) -> DomainResult<Vec<DateTime<Utc>>> {
        distinct_hours_of(&self.pool, "events").await
    }

    async fn count_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE ts >= ? AND ts < ?")
            .bind(start.to_rfc3339())
            .bind(end.to_rfc3339())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

#[derive(Clone)]
pub struct SqliteTextBufferRepository {
    pool: SqlitePool,
}

impl SqliteTextBufferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TextBufferRepository for SqliteTextBufferRepository {
    async fn insert(&self, buffer: &TextBuffer) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO text_buffers (id, ts, path, bytes, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(buffer.id.to_string())
        .bind(buffer.ts.to_rfc3339())
        .bind(&buffer.path)
        .bind(i64::try_from(buffer.bytes).unwrap_or(i64::MAX))
        .bind(buffer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM text_buffers WHERE ts >= ? AND ts < ?")
                .bind(start.to_rfc3339())
                .bind(end.to_rfc3339())
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    async fn delete_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM text_buffers WHERE ts >= ? AND ts < ?")
            .bind(start.to_rfc3339())
            .bind(end.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};
    use chrono::TimeZone;

    async fn setup() -> SqlitePool {
        let pool = create_test_pool().await.unwrap();
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn distinct_hours_truncates_and_dedupes() {
        let pool = setup().await;
        let repo = SqliteScreenshotRepository::new(pool);

        for (minute, suffix) in [(5, "a"), (25, "b"), (45, "c")] {
            let ts = Utc.with_ymd_and_hms(2026, 1, 29, 9, minute, 0).unwrap();
            repo.insert(&Screenshot::new(ts, "m1", format!("/c/{suffix}.png"), suffix))
                .await
                .unwrap();
        }
        let ts = Utc.with_ymd_and_hms(2026, 1, 29, 11, 0, 1).unwrap();
        repo.insert(&Screenshot::new(ts, "m1", "/c/d.png", "d"))
            .await
            .unwrap();

        let hours = repo.distinct_hours().await.unwrap();
        assert_eq!(
            hours,
            vec![
                Utc.with_ymd_and_hms(2026, 1, 29, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 1, 29, 11, 0, 0).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn count_and_delete_are_half_open() {
        let pool = setup().await;
        let repo = SqliteScreenshotRepository::new(pool);

        let h9 = Utc.with_ymd_and_hms(2026, 1, 29, 9, 0, 0).unwrap();
        let h10 = Utc.with_ymd_and_hms(2026, 1, 29, 10, 0, 0).unwrap();
        repo.insert(&Screenshot::new(h9, "m1", "/c/a.png", "a")).await.unwrap();
        repo.insert(&Screenshot::new(h10, "m1", "/c/b.png", "b")).await.unwrap();

        assert_eq!(repo.count_in(h9, h10).await.unwrap(), 1);
        assert_eq!(repo.delete_in(h9, h10).await.unwrap(), 1);
        assert_eq!(repo.count_in(h9, h10).await.unwrap(), 0);
        // The row at the end boundary survives.
        assert_eq!(repo.paths_in(h10, h10 + chrono::Duration::hours(1)).await.unwrap().len(), 1);
    }
}
