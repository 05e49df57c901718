use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Note, NoteType};

/// Repository port for note persistence.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note, or replace the existing row for the same
    /// (note_type, start_ts) window keeping that row's identity fresh.
    async fn upsert(&self, note: &Note) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Note>>;

    /// The note covering one exact window, if any.
    async fn get_by_window(
        &self,
        note_type: NoteType,
        start_ts: DateTime<Utc>,
    ) -> DomainResult<Option<Note>>;

    async fn list(&self, note_type: Option<NoteType>) -> DomainResult<Vec<Note>>;

    /// Notes of one type whose window starts inside [start, end).
    async fn list_in_range(
        &self,
        note_type: NoteType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Note>>;

    async fn count(&self, note_type: Option<NoteType>) -> DomainResult<i64>;

    /// Distinct window starts that have a note of the given type.
    async fn window_starts(&self, note_type: NoteType) -> DomainResult<Vec<DateTime<Utc>>>;

    /// Delete the note row together with its entity links and embedding
    /// rows. The matching ledger row is NOT touched here; callers that
    /// reopen a window must delete it explicitly.
    async fn delete_with_dependents(&self, id: Uuid) -> DomainResult<()>;
}
