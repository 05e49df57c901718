//! Common test utilities for integration tests.
//!
//! Builds an in-memory datastore plus a temp-dir data layout, and seeds
//! evidence/notes the way the capture and summarization collaborators
//! would.

use chrono::{DateTime, Utc};
use serde_json::json;
use tempfile::TempDir;

use recap::adapters::sqlite::{all_embedded_migrations, create_test_pool, Migrator};
use recap::domain::models::{ArtifactKind, Event, Note, NoteType, Screenshot};
use recap::domain::ports::{EventRepository as _, NoteRepository as _, ScreenshotRepository as _};
use recap::{AppContext, Config};

pub struct TestHarness {
    // Held so the data directory outlives the test.
    #[allow(dead_code)]
    pub dir: TempDir,
    pub ctx: AppContext,
}

#[allow(dead_code)]
pub async fn harness() -> TestHarness {
    harness_with(|_| {}).await
}

#[allow(dead_code)]
pub async fn harness_with(customize: impl FnOnce(&mut Config)) -> TestHarness {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = Config::default();
    config.data_dir = dir.path().join("data").display().to_string();
    config.database.path = ":memory:".to_string();
    customize(&mut config);

    let pool = create_test_pool().await.expect("Failed to create test pool");
    Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .expect("Failed to run migrations");

    let ctx = AppContext::from_pool(config, pool);
    std::fs::create_dir_all(ctx.layout.notes_root()).unwrap();
    for kind in ArtifactKind::all() {
        std::fs::create_dir_all(ctx.layout.cache_kind_dir(kind)).unwrap();
    }

    TestHarness { dir, ctx }
}

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// Write `count` screenshot files for an hour, named by the capture
/// daemon's convention. Returns the file paths.
pub fn seed_screenshot_files(
    harness: &TestHarness,
    hour: DateTime<Utc>,
    count: usize,
) -> Vec<String> {
    let dir = harness.ctx.layout.cache_hour_dir(ArtifactKind::Screenshots, hour);
    std::fs::create_dir_all(&dir).unwrap();

    let mut paths = Vec::new();
    for i in 0..count {
        let shot_ts = hour + chrono::Duration::minutes(i as i64);
        let name = format!("{}_m1_fp{:04}.png", shot_ts.format("%Y%m%dT%H%M%S"), i);
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; 64]).unwrap();
        paths.push(path.display().to_string());
    }
    paths
}

/// Register datastore rows for already-written screenshot files.
#[allow(dead_code)]
pub async fn seed_screenshot_rows(
    harness: &TestHarness,
    hour: DateTime<Utc>,
    paths: &[String],
) {
    for (i, path) in paths.iter().enumerate() {
        let shot_ts = hour + chrono::Duration::minutes(i as i64);
        let row = Screenshot::new(shot_ts, "m1", path.clone(), format!("fp{i:04}"));
        harness.ctx.screenshots.insert(&row).await.unwrap();
    }
}

#[allow(dead_code)]
pub async fn seed_events(harness: &TestHarness, hour: DateTime<Utc>, count: usize) {
    for i in 0..count {
        let event_ts = hour + chrono::Duration::minutes(i as i64);
        let mut event = Event::new(event_ts, "window_focus");
        event.app_name = Some("editor".to_string());
        harness.ctx.events.insert(&event).await.unwrap();
    }
}

/// Create a note row plus its on-disk markdown file with a valid identity
/// header, the way a successful summarization leaves the system.
pub async fn write_note(
    harness: &TestHarness,
    note_type: NoteType,
    start: DateTime<Utc>,
) -> Note {
    let layout = &harness.ctx.layout;
    let calendar = harness.ctx.calendar;
    let (end, path) = match note_type {
        NoteType::Hour => (
            start + chrono::Duration::hours(1),
            layout.hour_note_path(start),
        ),
        NoteType::Day => (
            start + chrono::Duration::hours(24),
            layout.day_note_path(calendar.trace_day(start)),
        ),
    };

    let note = Note::new(
        note_type,
        start,
        end,
        path.display().to_string(),
        json!({
            "summary": "Worked on the quarterly report.",
            "activities": [{"title": "Edited report.md"}],
        }),
    );

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let document = note.header().to_markdown("Worked on the quarterly report.");
    std::fs::write(&path, document).unwrap();

    harness.ctx.notes.upsert(&note).await.unwrap();
    note
}
