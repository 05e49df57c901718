//! Domain errors for the recap reconciliation engine.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the recap system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),

    #[error("Ledger row not found for {job_type} window {window_start}")]
    JobNotFound {
        job_type: String,
        window_start: DateTime<Utc>,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Summarizer call failed: {0}")]
    SummarizerFailed(String),

    #[error("Summarizer call timed out after {0}s")]
    SummarizerTimeout(u64),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::IoError(err.to_string())
    }
}
