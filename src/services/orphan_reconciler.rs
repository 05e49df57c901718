//! Filesystem/datastore reconciliation.
//!
//! Four idempotent repair passes run before gap scanning so the scan sees a
//! consistent picture. Each pass is safe to re-run and logs-and-continues
//! past individual failures; one bad file never blocks the rest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::domain::calendar::{DataLayout, TraceDayCalendar};
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    parse_screenshot_file_name, ArtifactKind, JobType, Note, NoteHeader, NoteType, Screenshot,
};
use crate::domain::ports::{JobRepository, NoteRepository, ScreenshotRepository};
use crate::services::gap_scanner::note_file_exists;
use crate::services::idle_classifier::is_placeholder_note;

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileStats {
    pub screenshots_registered: u64,
    pub notes_reindexed: u64,
    pub orphan_notes_removed: u64,
    pub placeholders_purged: u64,
    /// Failures that were logged and skipped
    pub errors: u64,
}

impl ReconcileStats {
    pub fn total_repairs(&self) -> u64 {
        self.screenshots_registered
            + self.notes_reindexed
            + self.orphan_notes_removed
            + self.placeholders_purged
    }
}

pub struct OrphanReconciler {
    screenshots: Arc<dyn ScreenshotRepository>,
    notes: Arc<dyn NoteRepository>,
    jobs: Arc<dyn JobRepository>,
    layout: DataLayout,
}

impl OrphanReconciler {
    pub fn new(
        screenshots: Arc<dyn ScreenshotRepository>,
        notes: Arc<dyn NoteRepository>,
        jobs: Arc<dyn JobRepository>,
        layout: DataLayout,
    ) -> Self {
        Self {
            screenshots,
            notes,
            jobs,
            layout,
        }
    }

    /// All four passes, in dependency order. `dry_run` reports what would
    /// change without mutating anything.
    #[instrument(skip(self))]
    pub async fn run_all(&self, dry_run: bool) -> DomainResult<ReconcileStats> {
        let mut stats = ReconcileStats::default();
        stats = merge(stats, self.register_orphan_screenshots(dry_run).await?);
        stats = merge(stats, self.reindex_orphan_notes(dry_run).await?);
        stats = merge(stats, self.clean_orphan_note_records(dry_run).await?);
        stats = merge(stats, self.purge_placeholder_notes(dry_run).await?);

        if stats.total_repairs() > 0 {
            info!(
                screenshots = stats.screenshots_registered,
                reindexed = stats.notes_reindexed,
                orphans = stats.orphan_notes_removed,
                placeholders = stats.placeholders_purged,
                dry_run,
                "reconciliation repaired divergence"
            );
        }
        Ok(stats)
    }

    /// Pass 1: insert rows for on-disk screenshot files the datastore has
    /// never seen. Runs across every cache hour directory so frames captured
    /// while the datastore was unreachable cannot read as "no activity".
    pub async fn register_orphan_screenshots(&self, dry_run: bool) -> DomainResult<ReconcileStats> {
        let mut stats = ReconcileStats::default();

        for hour_dir in self.screenshot_hour_dirs() {
            let Some(hour) = self.hour_of_dir(&hour_dir) else {
                continue;
            };
            let (start, end) = TraceDayCalendar::hour_range(hour);

            let known: HashSet<String> = match self.screenshots.paths_in(start, end).await {
                Ok(paths) => paths.into_iter().collect(),
                Err(e) => {
                    warn!(dir = %hour_dir.display(), error = %e, "could not list known screenshots");
                    stats.errors += 1;
                    continue;
                }
            };

            let Ok(entries) = std::fs::read_dir(&hour_dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let path_str = path.to_string_lossy().into_owned();
                if known.contains(&path_str) {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let Some((ts, monitor_id, fingerprint)) = parse_screenshot_file_name(&name) else {
                    debug!(file = %name, "file name outside capture convention, ignoring");
                    continue;
                };

                if dry_run {
                    stats.screenshots_registered += 1;
                    continue;
                }
                let row = Screenshot::new(ts, monitor_id, path_str, fingerprint);
                match self.screenshots.insert(&row).await {
                    Ok(()) => stats.screenshots_registered += 1,
                    Err(e) => {
                        warn!(file = %name, error = %e, "failed to register screenshot");
                        stats.errors += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Pass 2: rebuild note rows from on-disk files when the datastore has
    /// fewer notes than the filesystem. Identity comes from each file's
    /// front-matter header; a minimal payload is reconstructed when the
    /// original is gone.
    pub async fn reindex_orphan_notes(&self, dry_run: bool) -> DomainResult<ReconcileStats> {
        let mut stats = ReconcileStats::default();

        let files = self.note_files();
        let rows = self.notes.count(None).await?;
        if files.len() as i64 <= rows {
            return Ok(stats);
        }
        info!(files = files.len(), rows, "note files outnumber note rows, re-indexing");

        for path in files {
            let document = match std::fs::read_to_string(&path) {
                Ok(d) => d,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "unreadable note file");
                    stats.errors += 1;
                    continue;
                }
            };
            let Some(header) = NoteHeader::from_markdown(&document) else {
                warn!(file = %path.display(), "note file has no parseable identity header");
                stats.errors += 1;
                continue;
            };

            match self.notes.get_by_window(header.note_type, header.start_ts).await {
                Ok(Some(existing)) if note_file_exists(&existing) => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "note lookup failed");
                    stats.errors += 1;
                    continue;
                }
            }

            if dry_run {
                stats.notes_reindexed += 1;
                continue;
            }

            let note = Note {
                id: header.id,
                note_type: header.note_type,
                start_ts: header.start_ts,
                end_ts: header.end_ts,
                file_path: path.to_string_lossy().into_owned(),
                json_payload: reconstructed_payload(&document),
                embedding_id: None,
                created_at: header.start_ts,
                updated_at: chrono::Utc::now(),
            };
            match self.notes.upsert(&note).await {
                Ok(()) => stats.notes_reindexed += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to re-index note");
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Pass 3: drop note rows whose backing file vanished, together with
    /// their entity links, embeddings, and the matching ledger row. The
    /// ledger delete is what lets the scan re-offer the window: the scan
    /// trusts `success` as proof of completion.
    pub async fn clean_orphan_note_records(&self, dry_run: bool) -> DomainResult<ReconcileStats> {
        let mut stats = ReconcileStats::default();

        for note in self.notes.list(None).await? {
            if note_file_exists(&note) {
                continue;
            }
            info!(note_id = %note.id, file = %note.file_path, "note file is gone, removing record");

            if dry_run {
                stats.orphan_notes_removed += 1;
                continue;
            }
            match self.remove_note_and_ledger_row(&note).await {
                Ok(()) => stats.orphan_notes_removed += 1,
                Err(e) => {
                    warn!(note_id = %note.id, error = %e, "failed to remove orphan note");
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Pass 4: purge placeholder notes (no-activity phrasing and zero
    /// non-trivial activities), file included, with the same cascade as
    /// pass 3.
    pub async fn purge_placeholder_notes(&self, dry_run: bool) -> DomainResult<ReconcileStats> {
        let mut stats = ReconcileStats::default();

        for note in self.notes.list(None).await? {
            if !is_placeholder_note(&note) {
                continue;
            }
            info!(note_id = %note.id, window = %note.start_ts, "purging placeholder note");

            if dry_run {
                stats.placeholders_purged += 1;
                continue;
            }

            // Delete the file first; a surviving file would be re-indexed
            // right back by pass 2.
            if Path::new(&note.file_path).is_file() {
                if let Err(e) = std::fs::remove_file(&note.file_path) {
                    warn!(file = %note.file_path, error = %e, "failed to delete placeholder file");
                    stats.errors += 1;
                    continue;
                }
            }
            match self.remove_note_and_ledger_row(&note).await {
                Ok(()) => stats.placeholders_purged += 1,
                Err(e) => {
                    warn!(note_id = %note.id, error = %e, "failed to purge placeholder note");
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }

    async fn remove_note_and_ledger_row(&self, note: &Note) -> DomainResult<()> {
        self.notes.delete_with_dependents(note.id).await?;
        let job_type = match note.note_type {
            NoteType::Hour => JobType::HourSummary,
            NoteType::Day => JobType::DaySummary,
        };
        self.jobs.delete(job_type, note.start_ts).await
    }

    fn screenshot_hour_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        let root = self.layout.cache_kind_dir(ArtifactKind::Screenshots);
        let Ok(day_entries) = std::fs::read_dir(root) else {
            return dirs;
        };
        for day_entry in day_entries.flatten() {
            if !day_entry.path().is_dir() {
                continue;
            }
            let Ok(hour_entries) = std::fs::read_dir(day_entry.path()) else {
                continue;
            };
            for hour_entry in hour_entries.flatten() {
                if hour_entry.path().is_dir() {
                    dirs.push(hour_entry.path());
                }
            }
        }
        dirs.sort();
        dirs
    }

    fn hour_of_dir(&self, hour_dir: &Path) -> Option<chrono::DateTime<chrono::Utc>> {
        let hour_name = hour_dir.file_name()?.to_string_lossy().into_owned();
        let day_name = hour_dir.parent()?.file_name()?.to_string_lossy().into_owned();
        self.layout.hour_from_cache_dir(&day_name, &hour_name)
    }

    fn note_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(day_entries) = std::fs::read_dir(self.layout.notes_root()) else {
            return files;
        };
        for day_entry in day_entries.flatten() {
            if !day_entry.path().is_dir() {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(day_entry.path()) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "md") {
                    files.push(path);
                }
            }
        }
        files.sort();
        files
    }
}

fn merge(a: ReconcileStats, b: ReconcileStats) -> ReconcileStats {
    ReconcileStats {
        screenshots_registered: a.screenshots_registered + b.screenshots_registered,
        notes_reindexed: a.notes_reindexed + b.notes_reindexed,
        orphan_notes_removed: a.orphan_notes_removed + b.orphan_notes_removed,
        placeholders_purged: a.placeholders_purged + b.placeholders_purged,
        errors: a.errors + b.errors,
    }
}

/// Minimal payload for a re-indexed note: the first substantive body line
/// as summary, flagged so revision passes know it is a reconstruction.
fn reconstructed_payload(document: &str) -> serde_json::Value {
    let body = document
        .strip_prefix("---")
        .and_then(|rest| rest.find("\n---").map(|end| &rest[end + 4..]))
        .unwrap_or(document);

    let summary = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .unwrap_or("Re-indexed from file");

    json!({
        "summary": summary,
        "activities": [],
        "reindexed": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstructed_payload_skips_headings_and_front_matter() {
        let doc = "---\nid: 0\n---\n\n# Hour summary\n\nWrote the design doc.\n";
        let payload = reconstructed_payload(doc);
        assert_eq!(payload["summary"], "Wrote the design doc.");
        assert_eq!(payload["reindexed"], true);
    }

    #[test]
    fn reconstructed_payload_handles_empty_body() {
        let payload = reconstructed_payload("---\nid: 0\n---\n\n");
        assert_eq!(payload["summary"], "Re-indexed from file");
    }
}
