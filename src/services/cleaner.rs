//! Artifact cleanup: the only component allowed to destroy raw evidence.
//!
//! Deletion is gated behind the integrity checkpoint unless forced, and
//! every deletion appends an immutable audit entry. The dry-run path shares
//! the counting walk with the real deletion so reported and actual behavior
//! cannot drift apart.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::domain::calendar::DataLayout;
use crate::domain::errors::DomainResult;
use crate::domain::models::{ArtifactKind, CleanupConfig, DeletionLogEntry};
use crate::domain::ports::{DeletionLogRepository, ScreenshotRepository, TextBufferRepository};
use crate::services::integrity::{IntegrityChecker, IntegrityReport};

/// Per-artifact-kind deletion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct KindStats {
    pub files_deleted: u64,
    pub bytes_deleted: u64,
    pub rows_deleted: u64,
}

/// Counts for one cleanup run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CleanupStats {
    pub screenshots: KindStats,
    pub text_buffers: KindStats,
    pub ocr_text: KindStats,
    pub dirs_pruned: u64,
    pub integrity_passed: bool,
    pub dry_run: bool,
}

impl CleanupStats {
    pub fn total_files(&self) -> u64 {
        self.screenshots.files_deleted + self.text_buffers.files_deleted + self.ocr_text.files_deleted
    }

    pub fn total_bytes(&self) -> u64 {
        self.screenshots.bytes_deleted + self.text_buffers.bytes_deleted + self.ocr_text.bytes_deleted
    }

    fn kind_mut(&mut self, kind: ArtifactKind) -> &mut KindStats {
        match kind {
            ArtifactKind::Screenshots => &mut self.screenshots,
            ArtifactKind::TextBuffers => &mut self.text_buffers,
            ArtifactKind::OcrText => &mut self.ocr_text,
        }
    }

    pub fn kind(&self, kind: ArtifactKind) -> KindStats {
        match kind {
            ArtifactKind::Screenshots => self.screenshots,
            ArtifactKind::TextBuffers => self.text_buffers,
            ArtifactKind::OcrText => self.ocr_text,
        }
    }
}

/// Outcome of a cleanup request.
#[derive(Debug)]
pub enum CleanupOutcome {
    /// Deletion (or its dry-run accounting) went through
    Done(CleanupStats),
    /// The integrity checkpoint failed; nothing was touched
    Blocked(IntegrityReport),
}

pub struct ArtifactCleaner {
    integrity: Arc<IntegrityChecker>,
    screenshots: Arc<dyn ScreenshotRepository>,
    text_buffers: Arc<dyn TextBufferRepository>,
    deletion_log: Arc<dyn DeletionLogRepository>,
    layout: DataLayout,
    config: CleanupConfig,
}

impl ArtifactCleaner {
    pub fn new(
        integrity: Arc<IntegrityChecker>,
        screenshots: Arc<dyn ScreenshotRepository>,
        text_buffers: Arc<dyn TextBufferRepository>,
        deletion_log: Arc<dyn DeletionLogRepository>,
        layout: DataLayout,
        config: CleanupConfig,
    ) -> Self {
        Self {
            integrity,
            screenshots,
            text_buffers,
            deletion_log,
            layout,
            config,
        }
    }

    /// Delete one trace day's raw caches and their datastore rows.
    ///
    /// Event rows are deliberately retained: they carry no raw payload and
    /// stay useful as history.
    #[instrument(skip(self))]
    pub async fn cleanup(
        &self,
        day: NaiveDate,
        force: bool,
        dry_run: bool,
    ) -> DomainResult<CleanupOutcome> {
        let integrity_passed = if force {
            // No checkpoint ran; the audit log records that honestly.
            false
        } else {
            let report = self
                .integrity
                .check(day, self.config.require_embeddings, self.config.require_day_note)
                .await?;
            if !report.passed() {
                warn!(day = %day, errors = report.errors.len(), "integrity checkpoint failed, no deletion");
                return Ok(CleanupOutcome::Blocked(report));
            }
            true
        };

        let mut stats = CleanupStats {
            integrity_passed,
            dry_run,
            ..CleanupStats::default()
        };

        let (start, end) = self.layout.calendar().day_range(day);

        for kind in ArtifactKind::all() {
            let dir = self.layout.cache_day_dir(kind, day);
            let (files, bytes) = count_tree(&dir);

            let rows = match kind {
                ArtifactKind::Screenshots => {
                    if dry_run {
                        u64::try_from(self.screenshots.count_in(start, end).await?).unwrap_or(0)
                    } else {
                        self.screenshots.delete_in(start, end).await?
                    }
                }
                ArtifactKind::TextBuffers => {
                    if dry_run {
                        u64::try_from(self.text_buffers.count_in(start, end).await?).unwrap_or(0)
                    } else {
                        self.text_buffers.delete_in(start, end).await?
                    }
                }
                // OCR text lives only on disk.
                ArtifactKind::OcrText => 0,
            };

            if !dry_run && dir.exists() {
                std::fs::remove_dir_all(&dir)?;
                stats.dirs_pruned += 1;
            }

            let entry = stats.kind_mut(kind);
            entry.files_deleted = files;
            entry.bytes_deleted = bytes;
            entry.rows_deleted = rows;

            if !dry_run {
                self.deletion_log
                    .append(&DeletionLogEntry::new(
                        day,
                        kind,
                        files,
                        bytes,
                        rows,
                        integrity_passed,
                    ))
                    .await?;
            }
        }

        if !dry_run {
            stats.dirs_pruned += self.prune_empty_kind_dirs();
        }

        info!(
            day = %day,
            files = stats.total_files(),
            bytes = stats.total_bytes(),
            dry_run,
            "cleanup finished"
        );
        Ok(CleanupOutcome::Done(stats))
    }

    /// Drop artifact-kind roots that hold no remaining date directories.
    fn prune_empty_kind_dirs(&self) -> u64 {
        let mut pruned = 0;
        for kind in ArtifactKind::all() {
            let dir = self.layout.cache_kind_dir(kind);
            let is_empty = std::fs::read_dir(&dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if is_empty && std::fs::remove_dir(&dir).is_ok() {
                pruned += 1;
            }
        }
        pruned
    }
}

/// Recursive (files, bytes) count of a directory tree. Both the dry run
/// and the real deletion report from this same walk.
fn count_tree(dir: &Path) -> (u64, u64) {
    let mut files = 0;
    let mut bytes = 0;
    let Ok(entries) = std::fs::read_dir(dir) else {
        return (0, 0);
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let (f, b) = count_tree(&path);
            files += f;
            bytes += b;
        } else if let Ok(metadata) = entry.metadata() {
            files += 1;
            bytes += metadata.len();
        }
    }
    (files, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_tree_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("02")).unwrap();
        std::fs::write(dir.path().join("02/a.png"), vec![0u8; 100]).unwrap();
        std::fs::write(dir.path().join("02/b.png"), vec![0u8; 50]).unwrap();
        std::fs::create_dir_all(dir.path().join("03")).unwrap();
        std::fs::write(dir.path().join("03/c.png"), vec![0u8; 25]).unwrap();

        assert_eq!(count_tree(dir.path()), (3, 175));
        assert_eq!(count_tree(&dir.path().join("missing")), (0, 0));
    }
}
