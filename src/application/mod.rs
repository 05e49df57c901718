//! Application layer: context wiring and backfill orchestration.

pub mod backfill;
pub mod context;

pub use backfill::{BackfillOrchestrator, BackfillReport};
pub use context::AppContext;
