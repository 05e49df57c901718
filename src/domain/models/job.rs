//! Job ledger domain model.
//!
//! One row per (job type, window start); that pair is the idempotency key
//! for backfill. `Success` is terminal and means "never reconsider this
//! window", whether or not a note was produced: a genuinely idle hour
//! finishes as `Success` with no note. `Failed` is retried on the next scan.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a ledger row. Closed set; the jobs table carries a matching
/// CHECK constraint so no other value is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Window known but not yet claimed
    Pending,
    /// Claimed by a backfill run
    Running,
    /// Durably done; the window is never offered again
    Success,
    /// Eligible for retry on the next scan
    Failed,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Valid transitions from this status. Failed rows reopen to Pending
    /// before they can be claimed again; stale Running rows are swept back
    /// to Pending on startup.
    pub fn valid_transitions(&self) -> Vec<JobStatus> {
        match self {
            Self::Pending => vec![Self::Running],
            Self::Running => vec![Self::Success, Self::Failed, Self::Pending],
            Self::Failed => vec![Self::Pending],
            Self::Success => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// Kind of summarization work a ledger row tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Produce the note for one clock hour
    HourSummary,
    /// Produce the aggregate note for one trace day
    DaySummary,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HourSummary => "hour_summary",
            Self::DaySummary => "day_summary",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hour_summary" => Some(Self::HourSummary),
            "day_summary" => Some(Self::DaySummary),
            _ => None,
        }
    }

    /// Length of the window this job type covers.
    pub fn window_length(&self) -> Duration {
        match self {
            Self::HourSummary => Duration::hours(1),
            Self::DaySummary => Duration::hours(24),
        }
    }
}

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    /// Window start (inclusive); with `job_type` forms the idempotency key
    pub window_start: DateTime<Utc>,
    /// Window end (exclusive)
    pub window_end: DateTime<Utc>,
    pub status: JobStatus,
    /// Times this window has been claimed
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Opaque outcome payload, e.g. which note was produced
    pub result_json: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new_pending(job_type: JobType, window_start: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_type,
            window_start,
            window_end: window_start + job_type.window_length(),
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
            result_json: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn success_is_the_only_terminal_status() {
        assert!(JobStatus::Success.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Failed.is_terminal());
        assert!(JobStatus::Success.valid_transitions().is_empty());
    }

    #[test]
    fn failed_reopens_to_pending_not_running() {
        assert!(JobStatus::Failed.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
    }

    #[test]
    fn running_can_be_swept_back_to_pending() {
        assert!(JobStatus::Running.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn new_pending_derives_window_end() {
        let start = Utc.with_ymd_and_hms(2026, 1, 29, 2, 0, 0).unwrap();
        let hour = Job::new_pending(JobType::HourSummary, start);
        assert_eq!(hour.window_end - hour.window_start, Duration::hours(1));
        let day = Job::new_pending(JobType::DaySummary, start);
        assert_eq!(day.window_end - day.window_start, Duration::hours(24));
        assert_eq!(day.attempts, 0);
        assert_eq!(day.status, JobStatus::Pending);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [JobStatus::Pending, JobStatus::Running, JobStatus::Success, JobStatus::Failed] {
            assert_eq!(JobStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::from_str("cancelled"), None);
    }
}
