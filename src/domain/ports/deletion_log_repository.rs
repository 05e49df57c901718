use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::DeletionLogEntry;

/// Repository port for the append-only deletion audit log.
#[async_trait]
pub trait DeletionLogRepository: Send + Sync {
    /// Append one entry. There is deliberately no update or delete.
    async fn append(&self, entry: &DeletionLogEntry) -> DomainResult<()>;

    async fn list(&self) -> DomainResult<Vec<DeletionLogEntry>>;
}
