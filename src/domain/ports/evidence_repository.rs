use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Event, Screenshot, TextBuffer};

/// Repository port for screenshot evidence rows.
#[async_trait]
pub trait ScreenshotRepository: Send + Sync {
    async fn insert(&self, screenshot: &Screenshot) -> DomainResult<()>;

    /// Hour-starts that have at least one screenshot row.
    async fn distinct_hours(&self) -> DomainResult<Vec<DateTime<Utc>>>;

    async fn count_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<i64>;

    /// Paths of rows inside [start, end). Used to diff the datastore
    /// against on-disk cache directories.
    async fn paths_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Vec<String>>;

    /// Delete rows inside [start, end), returning how many went away.
    async fn delete_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<u64>;
}

/// Repository port for window/input event rows. Events carry no raw
/// payload and are retained by cleanup.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &Event) -> DomainResult<()>;

    /// Hour-starts that have at least one event row.
    async fn distinct_hours(&self) -> DomainResult<Vec<DateTime<Utc>>>;

    async fn count_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<i64>;
}

/// Repository port for text buffer rows.
#[async_trait]
pub trait TextBufferRepository: Send + Sync {
    async fn insert(&self, buffer: &TextBuffer) -> DomainResult<()>;

    async fn count_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<i64>;

    async fn delete_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<u64>;
}
