//! Deletion audit log model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::ArtifactKind;

/// Append-only record of one artifact kind's deletion for one trace day.
/// Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionLogEntry {
    pub id: Uuid,
    /// Trace day whose artifacts were deleted
    pub deleted_on: NaiveDate,
    pub artifact_kind: ArtifactKind,
    pub files_deleted: u64,
    pub bytes_deleted: u64,
    pub rows_deleted: u64,
    /// Whether the integrity checkpoint passed before deletion
    pub integrity_passed: bool,
    pub created_at: DateTime<Utc>,
}

impl DeletionLogEntry {
    pub fn new(
        deleted_on: NaiveDate,
        artifact_kind: ArtifactKind,
        files_deleted: u64,
        bytes_deleted: u64,
        rows_deleted: u64,
        integrity_passed: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            deleted_on,
            artifact_kind,
            files_deleted,
            bytes_deleted,
            rows_deleted,
            integrity_passed,
            created_at: Utc::now(),
        }
    }
}
