//! Backfill orchestration integration tests: idempotency, outcome
//! classification, rate limiting, and cancellation.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use recap::adapters::summarizer::{MockSummarizer, ScriptedReply};
use recap::domain::models::{JobStatus, JobType, NoteType};
use recap::domain::ports::{JobRepository as _, NoteRepository as _, SummarizeOutcome};
use uuid::Uuid;

use common::{harness, harness_with, seed_screenshot_files, ts, write_note};

#[tokio::test]
async fn backfill_twice_with_no_new_evidence_is_idempotent() {
    let h = harness().await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());
    let now = ts("2026-01-29T12:30:00Z");

    seed_screenshot_files(&h, ts("2026-01-29T09:00:00Z"), 3);

    let first = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(first.processed, 1);
    assert_eq!(first.skipped_idle, 1);

    let jobs_after_first = h.ctx.jobs.list(None).await.unwrap().len();
    let notes_after_first = h.ctx.notes.count(None).await.unwrap();

    let second = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(h.ctx.jobs.list(None).await.unwrap().len(), jobs_after_first);
    assert_eq!(h.ctx.notes.count(None).await.unwrap(), notes_after_first);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn genuine_idle_is_success_but_empty_response_is_failed() {
    let h = harness().await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());
    let now = ts("2026-01-29T12:30:00Z");

    let away = ts("2026-01-29T08:00:00Z");
    let garbage = ts("2026-01-29T09:00:00Z");
    seed_screenshot_files(&h, away, 3);
    seed_screenshot_files(&h, garbage, 3);

    // Replies arrive in chronological window order.
    mock.push(ScriptedReply::Outcome(SummarizeOutcome::idle("user away")));
    mock.push(ScriptedReply::Outcome(SummarizeOutcome::idle(
        "no meaningful content",
    )));

    let report = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(report.skipped_idle, 1);
    assert_eq!(report.failed, 1);

    let settled = h.ctx.jobs.get(JobType::HourSummary, away).await.unwrap().unwrap();
    assert_eq!(settled.status, JobStatus::Success);

    let retry = h.ctx.jobs.get(JobType::HourSummary, garbage).await.unwrap().unwrap();
    assert_eq!(retry.status, JobStatus::Failed);
    assert!(retry.last_error.as_deref().unwrap().contains("no meaningful content"));

    // The failed window is re-offered and can settle on the next run.
    mock.push(ScriptedReply::Outcome(SummarizeOutcome::idle("user away")));
    let report = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped_idle, 1);

    let settled = h.ctx.jobs.get(JobType::HourSummary, garbage).await.unwrap().unwrap();
    assert_eq!(settled.status, JobStatus::Success);
    assert_eq!(settled.attempts, 2);
}

#[tokio::test]
async fn transport_errors_and_timeouts_mark_failed() {
    let h = harness_with(|config| {
        config.backfill.summarize_timeout_secs = 1;
    })
    .await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());
    let now = ts("2026-01-29T12:30:00Z");

    let unreachable = ts("2026-01-29T08:00:00Z");
    let slow = ts("2026-01-29T09:00:00Z");
    seed_screenshot_files(&h, unreachable, 3);
    seed_screenshot_files(&h, slow, 3);

    mock.push(ScriptedReply::TransportError("connection refused".to_string()));
    mock.push(ScriptedReply::Hang(Duration::from_secs(5)));

    let report = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(report.failed, 2);

    let job = h.ctx.jobs.get(JobType::HourSummary, unreachable).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.last_error.as_deref().unwrap().contains("connection refused"));

    let job = h.ctx.jobs.get(JobType::HourSummary, slow).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.last_error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn a_produced_note_settles_the_window() {
    let h = harness().await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());
    let now = ts("2026-01-29T12:30:00Z");

    let hour = ts("2026-01-29T09:00:00Z");
    seed_screenshot_files(&h, hour, 3);

    let note_id = Uuid::new_v4();
    mock.push(ScriptedReply::Outcome(SummarizeOutcome::note(
        note_id,
        "/data/notes/2026-01-29/hour_09.md",
    )));

    let report = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(report.notes_produced, 1);

    let job = h.ctx.jobs.get(JobType::HourSummary, hour).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(
        job.result_json.unwrap()["note_id"],
        serde_json::json!(note_id)
    );
}

#[tokio::test]
async fn one_run_processes_at_most_max_windows_oldest_first() {
    let h = harness().await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());

    let first_hour = ts("2026-01-28T06:00:00Z");
    let mut hours = Vec::new();
    for i in 0..25 {
        let hour = first_hour + chrono::Duration::hours(i);
        seed_screenshot_files(&h, hour, 3);
        hours.push(hour);
    }
    let now = *hours.last().unwrap() + chrono::Duration::hours(2);

    let report = orchestrator.run(now, false, Some(10)).await.unwrap();
    assert_eq!(report.processed, 10);
    assert_eq!(report.remaining, 15);

    // Exactly the ten oldest windows, in order.
    let called: Vec<_> = mock.calls().iter().map(|r| r.window_start).collect();
    assert_eq!(called, hours[..10].to_vec());

    // The next run picks up where this one stopped.
    let report = orchestrator.run(now, false, Some(10)).await.unwrap();
    assert_eq!(report.processed, 10);
    assert_eq!(report.remaining, 5);

    let report = orchestrator.run(now, false, Some(10)).await.unwrap();
    assert_eq!(report.processed, 5);
    assert_eq!(report.remaining, 0);
}

#[tokio::test]
async fn day_summaries_run_for_days_with_hour_notes() {
    let h = harness().await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());

    write_note(&h, NoteType::Hour, ts("2026-01-27T10:00:00Z")).await;
    let day = h.ctx.calendar.trace_day(ts("2026-01-27T10:00:00Z"));
    let (day_start, day_end) = h.ctx.calendar.day_range(day);

    let note_id = Uuid::new_v4();
    mock.push(ScriptedReply::Outcome(SummarizeOutcome::note(
        note_id,
        "/data/notes/2026-01-27/day_2026-01-27.md",
    )));

    let report = orchestrator
        .run(ts("2026-01-29T12:00:00Z"), false, None)
        .await
        .unwrap();
    assert_eq!(report.notes_produced, 1);

    let call = &mock.calls()[0];
    assert_eq!(call.window_start, day_start);
    assert_eq!(call.window_end, day_end);

    let job = h.ctx.jobs.get(JobType::DaySummary, day_start).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Success);
}

#[tokio::test]
async fn force_reprocesses_settled_windows_and_passes_force_through() {
    let h = harness().await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());
    let now = ts("2026-01-29T12:30:00Z");

    let hour = ts("2026-01-29T09:00:00Z");
    seed_screenshot_files(&h, hour, 3);

    orchestrator.run(now, false, None).await.unwrap();
    let settled = h.ctx.jobs.get(JobType::HourSummary, hour).await.unwrap().unwrap();
    assert_eq!(settled.status, JobStatus::Success);
    assert_eq!(settled.attempts, 1);

    // Without force, nothing to do.
    let report = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(report.processed, 0);

    // With force the settled window is reprocessed from a fresh row.
    let report = orchestrator.run(now, true, None).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(mock.call_count(), 2);
    assert!(mock.calls()[1].force);

    let reprocessed = h.ctx.jobs.get(JobType::HourSummary, hour).await.unwrap().unwrap();
    assert_eq!(reprocessed.attempts, 1);
}

#[tokio::test]
async fn stop_flag_leaves_windows_for_the_next_run() {
    let h = harness().await;
    let mock = Arc::new(MockSummarizer::new());
    let orchestrator = h.ctx.backfill_orchestrator(mock.clone());
    let now = ts("2026-01-29T12:30:00Z");

    for i in 0..3 {
        seed_screenshot_files(&h, ts("2026-01-29T06:00:00Z") + chrono::Duration::hours(i), 3);
    }

    orchestrator.stop_handle().store(true, Ordering::SeqCst);
    let report = orchestrator.run(now, false, None).await.unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(report.remaining, 3);
    assert_eq!(mock.call_count(), 0);
}
