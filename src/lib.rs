//! Recap - Activity Ledger Reconciliation Engine
//!
//! Recap keeps a datastore of captured activity evidence and its derived
//! notes mutually consistent: it detects hours of real activity that never
//! got a note, repairs divergence between the filesystem and the datastore,
//! drives idempotent rate-limited backfill through an external summarizer,
//! and gates irreversible deletion of raw evidence behind an integrity
//! checkpoint with an append-only audit log.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, trace-day arithmetic, and ports
//! - **Application Layer** (`application`): context wiring and backfill
//!   orchestration
//! - **Service Layer** (`services`): gap scanning, reconciliation,
//!   integrity checking, and cleanup
//! - **Adapters** (`adapters`): SQLite repositories and summarizer clients
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{AppContext, BackfillOrchestrator, BackfillReport};
pub use domain::calendar::{DataLayout, TraceDayCalendar};
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ArtifactKind, Config, DeletionLogEntry, Job, JobStatus, JobType, Note, NoteHeader, NoteType,
    Screenshot,
};
pub use domain::ports::{
    IdleClassifier, IdleKind, JobRepository, NoteRepository, SummarizeOutcome, SummarizeRequest,
    Summarizer,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ArtifactCleaner, CleanupOutcome, CleanupStats, GapScanner, IntegrityChecker, IntegrityReport,
    OrphanReconciler, PhraseIdleClassifier, ReconcileStats,
};
