//! Reconciliation engine services.

pub mod cleaner;
pub mod gap_scanner;
pub mod idle_classifier;
pub mod integrity;
pub mod orphan_reconciler;

pub use cleaner::{ArtifactCleaner, CleanupOutcome, CleanupStats, KindStats};
pub use gap_scanner::GapScanner;
pub use idle_classifier::{is_placeholder_note, PhraseIdleClassifier};
pub use integrity::{IntegrityChecker, IntegrityReport};
pub use orphan_reconciler::{OrphanReconciler, ReconcileStats};
