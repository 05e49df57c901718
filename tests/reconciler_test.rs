//! Orphan reconciler integration tests: the four repair passes and the
//! self-healing property.

mod common;

use recap::domain::models::{Job, JobType, Note, NoteType};
use recap::domain::ports::{JobRepository as _, NoteRepository as _, ScreenshotRepository as _};
use serde_json::json;

use common::{harness, seed_screenshot_files, seed_screenshot_rows, ts, write_note};

#[tokio::test]
async fn registers_on_disk_screenshots_missing_from_datastore() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();

    let hour = ts("2026-01-29T09:00:00Z");
    let paths = seed_screenshot_files(&h, hour, 4);
    // Two of the four are already registered.
    seed_screenshot_rows(&h, hour, &paths[..2]).await;

    let stats = reconciler.run_all(false).await.unwrap();
    assert_eq!(stats.screenshots_registered, 2);

    let (start, end) = recap::TraceDayCalendar::hour_range(hour);
    assert_eq!(h.ctx.screenshots.count_in(start, end).await.unwrap(), 4);

    // Idempotent: a second pass registers nothing.
    let stats = reconciler.run_all(false).await.unwrap();
    assert_eq!(stats.screenshots_registered, 0);
}

#[tokio::test]
async fn nonconforming_file_names_are_ignored() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();

    let hour = ts("2026-01-29T09:00:00Z");
    let dir = h
        .ctx
        .layout
        .cache_hour_dir(recap::ArtifactKind::Screenshots, hour);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("thumbnail.png"), b"x").unwrap();
    std::fs::write(dir.join(".DS_Store"), b"x").unwrap();

    let stats = reconciler.run_all(false).await.unwrap();
    assert_eq!(stats.screenshots_registered, 0);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn reindexes_note_files_missing_from_datastore() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();

    // A note written the normal way, then its row lost out-of-band.
    let note = write_note(&h, NoteType::Hour, ts("2026-01-29T09:00:00Z")).await;
    h.ctx.notes.delete_with_dependents(note.id).await.unwrap();
    assert_eq!(h.ctx.notes.count(None).await.unwrap(), 0);

    let stats = reconciler.run_all(false).await.unwrap();
    assert_eq!(stats.notes_reindexed, 1);

    let restored = h
        .ctx
        .notes
        .get_by_window(NoteType::Hour, note.start_ts)
        .await
        .unwrap()
        .unwrap();
    // Identity comes from the file's front-matter header.
    assert_eq!(restored.id, note.id);
    assert_eq!(restored.end_ts, note.end_ts);
    assert_eq!(restored.json_payload["reindexed"], true);
}

#[tokio::test]
async fn removes_note_rows_whose_file_vanished_including_job_row() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();

    let start = ts("2026-01-29T09:00:00Z");
    let note = write_note(&h, NoteType::Hour, start).await;

    // The ledger recorded success for this window.
    h.ctx.jobs.insert(&Job::new_pending(JobType::HourSummary, start)).await.unwrap();
    assert!(h.ctx.jobs.claim(JobType::HourSummary, start).await.unwrap());
    h.ctx.jobs.mark_success(JobType::HourSummary, start, None).await.unwrap();

    std::fs::remove_file(&note.file_path).unwrap();

    let stats = reconciler.run_all(false).await.unwrap();
    assert_eq!(stats.orphan_notes_removed, 1);
    assert!(h.ctx.notes.get(note.id).await.unwrap().is_none());
    // Without this delete the scan would trust success forever.
    assert!(h.ctx.jobs.get(JobType::HourSummary, start).await.unwrap().is_none());
}

#[tokio::test]
async fn orphan_self_healing_reopens_the_hour_for_scanning() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();
    let scanner = h.ctx.gap_scanner();
    let now = ts("2026-01-29T12:30:00Z");

    let start = ts("2026-01-29T09:00:00Z");
    seed_screenshot_files(&h, start, 3);
    let note = write_note(&h, NoteType::Hour, start).await;
    h.ctx.jobs.insert(&Job::new_pending(JobType::HourSummary, start)).await.unwrap();
    assert!(h.ctx.jobs.claim(JobType::HourSummary, start).await.unwrap());
    h.ctx.jobs.mark_success(JobType::HourSummary, start, None).await.unwrap();

    // Settled: nothing missing.
    assert!(scanner.find_missing_hours(now, false).await.unwrap().is_empty());

    std::fs::remove_file(&note.file_path).unwrap();
    reconciler.run_all(false).await.unwrap();

    let missing = scanner.find_missing_hours(now, false).await.unwrap();
    assert_eq!(missing, vec![start]);
}

#[tokio::test]
async fn purges_placeholder_notes_with_file_and_job_row() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();

    let start = ts("2026-01-29T09:00:00Z");
    let path = h.ctx.layout.hour_note_path(start);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    let note = Note::new(
        NoteType::Hour,
        start,
        start + chrono::Duration::hours(1),
        path.display().to_string(),
        json!({"summary": "No activity detected during this hour.", "activities": []}),
    );
    std::fs::write(&path, note.header().to_markdown("No activity detected during this hour.")).unwrap();
    h.ctx.notes.upsert(&note).await.unwrap();

    h.ctx.jobs.insert(&Job::new_pending(JobType::HourSummary, start)).await.unwrap();
    assert!(h.ctx.jobs.claim(JobType::HourSummary, start).await.unwrap());
    h.ctx.jobs.mark_success(JobType::HourSummary, start, None).await.unwrap();

    let stats = reconciler.run_all(false).await.unwrap();
    assert_eq!(stats.placeholders_purged, 1);
    assert!(h.ctx.notes.get(note.id).await.unwrap().is_none());
    assert!(h.ctx.jobs.get(JobType::HourSummary, start).await.unwrap().is_none());
    // The file is gone too, otherwise re-indexing would bring it back.
    assert!(!path.exists());
}

#[tokio::test]
async fn substantive_notes_survive_all_passes() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();

    let note = write_note(&h, NoteType::Hour, ts("2026-01-29T09:00:00Z")).await;

    let stats = reconciler.run_all(false).await.unwrap();
    assert_eq!(stats.total_repairs(), 0);
    assert!(h.ctx.notes.get(note.id).await.unwrap().is_some());
    assert!(std::path::Path::new(&note.file_path).exists());
}

#[tokio::test]
async fn dry_run_counts_without_mutating() {
    let h = harness().await;
    let reconciler = h.ctx.orphan_reconciler();

    let hour = ts("2026-01-29T09:00:00Z");
    seed_screenshot_files(&h, hour, 3);
    let note = write_note(&h, NoteType::Hour, ts("2026-01-29T10:00:00Z")).await;
    std::fs::remove_file(&note.file_path).unwrap();

    let stats = reconciler.run_all(true).await.unwrap();
    assert_eq!(stats.screenshots_registered, 3);
    assert_eq!(stats.orphan_notes_removed, 1);

    // Nothing actually changed.
    let (start, end) = recap::TraceDayCalendar::hour_range(hour);
    assert_eq!(h.ctx.screenshots.count_in(start, end).await.unwrap(), 0);
    assert!(h.ctx.notes.get(note.id).await.unwrap().is_some());
}
