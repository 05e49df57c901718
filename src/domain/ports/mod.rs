//! Ports: async traits at the seams between the engine and its
//! collaborators (datastore, summarization service).

pub mod deletion_log_repository;
pub mod evidence_repository;
pub mod graph_repository;
pub mod job_repository;
pub mod note_repository;
pub mod summarizer;

pub use deletion_log_repository::DeletionLogRepository;
pub use evidence_repository::{EventRepository, ScreenshotRepository, TextBufferRepository};
pub use graph_repository::GraphRepository;
pub use job_repository::JobRepository;
pub use note_repository::NoteRepository;
pub use summarizer::{IdleClassifier, IdleKind, SummarizeOutcome, SummarizeRequest, Summarizer};
