//! SQLite implementation of the JobRepository.
//!
//! Every status change is a single conditional UPDATE keyed on the current
//! status, so concurrent triggers racing over the same window resolve at
//! the datastore rather than in application code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Job, JobStatus, JobType};
use crate::domain::ports::JobRepository;

#[derive(Clone)]
pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn conditional_update(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        from: JobStatus,
        to: JobStatus,
    ) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = ?, updated_at = ? \
             WHERE job_type = ? AND window_start = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(job_type.as_str())
        .bind(window_start.to_rfc3339())
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn current_status(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
    ) -> DomainResult<Option<JobStatus>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM jobs WHERE job_type = ? AND window_start = ?")
                .bind(job_type.as_str())
                .bind(window_start.to_rfc3339())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(s,)| JobStatus::from_str(&s)))
    }

    /// Error for a terminal-marking update that matched no running row.
    async fn transition_error(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        to: JobStatus,
    ) -> DomainError {
        match self.current_status(job_type, window_start).await {
            Ok(Some(status)) => DomainError::InvalidStateTransition {
                from: status.as_str().to_string(),
                to: to.as_str().to_string(),
            },
            _ => DomainError::JobNotFound {
                job_type: job_type.as_str().to_string(),
                window_start,
            },
        }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &Job) -> DomainResult<()> {
        let result_json = job
            .result_json
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO jobs (id, job_type, window_start, window_end, status, attempts,
               last_error, result_json, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(job.id.to_string())
        .bind(job.job_type.as_str())
        .bind(job.window_start.to_rfc3339())
        .bind(job.window_end.to_rfc3339())
        .bind(job.status.as_str())
        .bind(i64::from(job.attempts))
        .bind(&job.last_error)
        .bind(result_json)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
    ) -> DomainResult<Option<Job>> {
        let row: Option<JobRow> =
            sqlx::query_as("SELECT * FROM jobs WHERE job_type = ? AND window_start = ?")
                .bind(job_type.as_str())
                .bind(window_start.to_rfc3339())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn claim(&self, job_type: JobType, window_start: DateTime<Utc>) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'running', attempts = attempts + 1, updated_at = ? \
             WHERE job_type = ? AND window_start = ? AND status = 'pending'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(job_type.as_str())
        .bind(window_start.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reopen_failed(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
    ) -> DomainResult<bool> {
        self.conditional_update(job_type, window_start, JobStatus::Failed, JobStatus::Pending)
            .await
    }

    async fn mark_success(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        result_json: Option<serde_json::Value>,
    ) -> DomainResult<()> {
        let result_str = result_json.as_ref().map(serde_json::to_string).transpose()?;

        let result = sqlx::query(
            "UPDATE jobs SET status = 'success', result_json = ?, last_error = NULL, updated_at = ? \
             WHERE job_type = ? AND window_start = ? AND status = 'running'",
        )
        .bind(result_str)
        .bind(Utc::now().to_rfc3339())
        .bind(job_type.as_str())
        .bind(window_start.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self
                .transition_error(job_type, window_start, JobStatus::Success)
                .await);
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        error: &str,
    ) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', last_error = ?, updated_at = ? \
             WHERE job_type = ? AND window_start = ? AND status = 'running'",
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(job_type.as_str())
        .bind(window_start.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self
                .transition_error(job_type, window_start, JobStatus::Failed)
                .await);
        }
        Ok(())
    }

    async fn release_stale_running(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'pending', updated_at = ? \
             WHERE status = 'running' AND updated_at < ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, job_type: JobType, window_start: DateTime<Utc>) -> DomainResult<()> {
        sqlx::query("DELETE FROM jobs WHERE job_type = ? AND window_start = ?")
            .bind(job_type.as_str())
            .bind(window_start.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn windows_with_status(
        &self,
        job_type: JobType,
        status: JobStatus,
    ) -> DomainResult<Vec<DateTime<Utc>>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT window_start FROM jobs WHERE job_type = ? AND status = ? ORDER BY window_start",
        )
        .bind(job_type.as_str())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(ts,)| {
                DateTime::parse_from_rfc3339(&ts)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| DomainError::SerializationError(e.to_string()))
            })
            .collect()
    }

    async fn list(&self, job_type: Option<JobType>) -> DomainResult<Vec<Job>> {
        let rows: Vec<JobRow> = match job_type {
            Some(t) => {
                sqlx::query_as("SELECT * FROM jobs WHERE job_type = ? ORDER BY window_start")
                    .bind(t.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM jobs ORDER BY window_start")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_by_status(&self) -> DomainResult<HashMap<JobStatus, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = HashMap::new();
        for (status_str, count) in rows {
            if let Some(status) = JobStatus::from_str(&status_str) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    job_type: String,
    window_start: String,
    window_end: String,
    status: String,
    attempts: i64,
    last_error: Option<String>,
    result_json: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<JobRow> for Job {
    type Error = DomainError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| DomainError::SerializationError(e.to_string()))
        };

        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let job_type = JobType::from_str(&row.job_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid job type: {}", row.job_type))
        })?;

        let status = JobStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid status: {}", row.status))
        })?;

        let result_json = row
            .result_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Job {
            id,
            job_type,
            window_start: parse_ts(&row.window_start)?,
            window_end: parse_ts(&row.window_end)?,
            status,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            last_error: row.last_error,
            result_json,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};
    use chrono::{Duration, TimeZone};

    async fn setup_test_repo() -> SqliteJobRepository {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());
        migrator
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .unwrap();
        SqliteJobRepository::new(pool)
    }

    fn window() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 29, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn claim_succeeds_once_then_refuses() {
        let repo = setup_test_repo().await;
        let job = Job::new_pending(JobType::HourSummary, window());
        repo.insert(&job).await.unwrap();

        assert!(repo.claim(JobType::HourSummary, window()).await.unwrap());
        // Second claim sees a running row and loses.
        assert!(!repo.claim(JobType::HourSummary, window()).await.unwrap());

        let claimed = repo.get(JobType::HourSummary, window()).await.unwrap().unwrap();
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempts, 1);
    }

    #[tokio::test]
    async fn duplicate_window_insert_is_rejected() {
        let repo = setup_test_repo().await;
        repo.insert(&Job::new_pending(JobType::HourSummary, window()))
            .await
            .unwrap();
        let dup = repo.insert(&Job::new_pending(JobType::HourSummary, window())).await;
        assert!(dup.is_err());
        // Same window under a different job type is a distinct key.
        repo.insert(&Job::new_pending(JobType::DaySummary, window()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_rows_reopen_and_accumulate_attempts() {
        let repo = setup_test_repo().await;
        repo.insert(&Job::new_pending(JobType::HourSummary, window()))
            .await
            .unwrap();

        assert!(repo.claim(JobType::HourSummary, window()).await.unwrap());
        repo.mark_failed(JobType::HourSummary, window(), "upstream unreachable")
            .await
            .unwrap();

        assert!(repo.reopen_failed(JobType::HourSummary, window()).await.unwrap());
        assert!(repo.claim(JobType::HourSummary, window()).await.unwrap());
        repo.mark_success(JobType::HourSummary, window(), None)
            .await
            .unwrap();

        let job = repo.get(JobType::HourSummary, window()).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(job.attempts, 2);
        assert!(job.last_error.is_none());

        // Success is terminal: reopen and claim both refuse.
        assert!(!repo.reopen_failed(JobType::HourSummary, window()).await.unwrap());
        assert!(!repo.claim(JobType::HourSummary, window()).await.unwrap());
    }

    #[tokio::test]
    async fn mark_success_without_claim_is_an_error() {
        let repo = setup_test_repo().await;
        repo.insert(&Job::new_pending(JobType::HourSummary, window()))
            .await
            .unwrap();

        let err = repo.mark_success(JobType::HourSummary, window(), None).await;
        assert!(matches!(
            err,
            Err(DomainError::InvalidStateTransition { .. })
        ));

        let missing = repo
            .mark_failed(JobType::HourSummary, window() + Duration::hours(1), "x")
            .await;
        assert!(matches!(missing, Err(DomainError::JobNotFound { .. })));
    }

    #[tokio::test]
    async fn stale_running_rows_are_swept_back_to_pending() {
        let repo = setup_test_repo().await;
        repo.insert(&Job::new_pending(JobType::HourSummary, window()))
            .await
            .unwrap();
        assert!(repo.claim(JobType::HourSummary, window()).await.unwrap());

        // Nothing is stale yet.
        let cutoff = Utc::now() - Duration::minutes(60);
        assert_eq!(repo.release_stale_running(cutoff).await.unwrap(), 0);

        // With a future cutoff the row counts as stale.
        let released = repo
            .release_stale_running(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(released, 1);
        let job = repo.get(JobType::HourSummary, window()).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn windows_with_status_filters_by_type() {
        let repo = setup_test_repo().await;
        repo.insert(&Job::new_pending(JobType::HourSummary, window()))
            .await
            .unwrap();
        repo.insert(&Job::new_pending(JobType::DaySummary, window()))
            .await
            .unwrap();
        assert!(repo.claim(JobType::HourSummary, window()).await.unwrap());
        repo.mark_success(JobType::HourSummary, window(), None)
            .await
            .unwrap();

        let success = repo
            .windows_with_status(JobType::HourSummary, JobStatus::Success)
            .await
            .unwrap();
        assert_eq!(success, vec![window()]);
        assert!(repo
            .windows_with_status(JobType::DaySummary, JobStatus::Success)
            .await
            .unwrap()
            .is_empty());
    }
}
