use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Edge, Embedding, Entity};

/// Repository port for the entity graph attached to notes.
///
/// The engine never computes the graph; it validates references during the
/// integrity checkpoint and cascades link/embedding rows when a note row
/// is removed.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn insert_entity(&self, entity: &Entity) -> DomainResult<()>;

    async fn insert_edge(&self, edge: &Edge) -> DomainResult<()>;

    async fn link_note_entity(&self, note_id: Uuid, entity_id: Uuid) -> DomainResult<()>;

    async fn insert_embedding(&self, embedding: &Embedding) -> DomainResult<()>;

    async fn entity_exists(&self, id: Uuid) -> DomainResult<bool>;

    async fn embedding_exists(&self, id: Uuid) -> DomainResult<bool>;

    /// Entity ids linked from one note.
    async fn entity_ids_for_note(&self, note_id: Uuid) -> DomainResult<Vec<Uuid>>;

    /// Edges whose source or target is one of the given entities.
    async fn edges_touching(&self, entity_ids: &[Uuid]) -> DomainResult<Vec<Edge>>;
}
