use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Job, JobStatus, JobType};

/// Repository port for the processing ledger.
///
/// The (job_type, window_start) pair is the idempotency key; at most one
/// row exists per key. All status updates are conditional single-row
/// writes so concurrent triggers cannot double-process a window.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: &Job) -> DomainResult<()>;

    async fn get(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
    ) -> DomainResult<Option<Job>>;

    /// Atomically claim a pending window: pending -> running, attempts + 1.
    /// Returns false when the row is not currently pending (someone else
    /// claimed it, or it already finished). This is the only concurrency
    /// guard in the system.
    async fn claim(&self, job_type: JobType, window_start: DateTime<Utc>) -> DomainResult<bool>;

    /// Reopen a failed window for retry: failed -> pending. Returns false
    /// when the row is not currently failed.
    async fn reopen_failed(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// running -> success with an outcome payload.
    async fn mark_success(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        result_json: Option<serde_json::Value>,
    ) -> DomainResult<()>;

    /// running -> failed with the error text for the next scan.
    async fn mark_failed(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        error: &str,
    ) -> DomainResult<()>;

    /// Sweep running rows last touched before `cutoff` back to pending.
    /// Returns how many rows were reopened. Run at startup so a crash
    /// mid-window cannot wedge that window forever.
    async fn release_stale_running(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;

    /// Delete a ledger row so the window is re-offered as brand new.
    async fn delete(&self, job_type: JobType, window_start: DateTime<Utc>) -> DomainResult<()>;

    /// Window starts of all rows of one type in one status.
    async fn windows_with_status(
        &self,
        job_type: JobType,
        status: JobStatus,
    ) -> DomainResult<Vec<DateTime<Utc>>>;

    async fn list(&self, job_type: Option<JobType>) -> DomainResult<Vec<Job>>;

    async fn count_by_status(&self) -> DomainResult<HashMap<JobStatus, u64>>;
}
