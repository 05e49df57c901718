use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// One summarization request for a half-open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummarizeRequest {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Bypass idle/quality heuristics for manual reprocessing
    pub force: bool,
}

/// What the summarization service reported for one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarizeOutcome {
    pub success: bool,
    pub note_id: Option<Uuid>,
    pub file_path: Option<String>,
    pub error: Option<String>,
    /// The service chose not to produce a note for this window
    pub skipped_idle: bool,
    pub idle_reason: Option<String>,
}

impl SummarizeOutcome {
    pub fn note(note_id: Uuid, file_path: impl Into<String>) -> Self {
        Self {
            success: true,
            note_id: Some(note_id),
            file_path: Some(file_path.into()),
            ..Self::default()
        }
    }

    pub fn idle(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped_idle: true,
            idle_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// The external summarization service.
///
/// Implementations must be idempotent per window when `force` is false
/// (checking for an existing note first). Transport-level failures surface
/// as errors; service-level refusals come back as a `SummarizeOutcome`
/// with `success == false`.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: SummarizeRequest) -> DomainResult<SummarizeOutcome>;
}

/// How to read an idle reason reported by the summarizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleKind {
    /// Nothing happened in the window; recording success is correct
    Genuine,
    /// The upstream service returned an empty or placeholder response;
    /// the window must be retried
    EmptyResponse,
}

/// Pluggable classification of idle reasons.
///
/// The default implementation is a substring heuristic over LLM-generated
/// text; a structured `reason_kind` flag from the summarizer can replace it
/// without touching the backfill state machine.
pub trait IdleClassifier: Send + Sync {
    fn classify(&self, idle_reason: &str) -> IdleKind;
}
