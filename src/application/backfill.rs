//! Backfill orchestration: claim missing windows, drive the summarizer,
//! and settle each ledger row into a terminal state.
//!
//! The per-window flow is ensure-row, claim (compare-and-set), summarize
//! under a timeout, then classify the outcome. The claim is the only
//! concurrency guard: two triggers can both decide a window is missing,
//! but only one wins the conditional update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::domain::calendar::TraceDayCalendar;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BackfillConfig, Job, JobStatus, JobType};
use crate::domain::ports::{
    IdleClassifier, IdleKind, JobRepository, SummarizeOutcome, SummarizeRequest, Summarizer,
};
use crate::services::{GapScanner, OrphanReconciler, ReconcileStats};

/// What one backfill run did.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BackfillReport {
    /// Windows this run attempted (claimed)
    pub processed: usize,
    /// Windows that produced a note
    pub notes_produced: usize,
    /// Windows settled as genuinely idle
    pub skipped_idle: usize,
    /// Windows recorded failed for the next scan
    pub failed: usize,
    /// Windows another trigger owned or that were already settled
    pub skipped: usize,
    /// Missing windows left for the next run by the rate limit
    pub remaining: usize,
    /// Reconciliation repairs that ran before scanning
    pub reconcile: ReconcileStats,
}

/// Terminal classification of one processed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowOutcome {
    NoteProduced,
    Idle,
    Failed,
    Skipped,
}

pub struct BackfillOrchestrator {
    reconciler: Arc<OrphanReconciler>,
    scanner: Arc<GapScanner>,
    jobs: Arc<dyn JobRepository>,
    summarizer: Arc<dyn Summarizer>,
    classifier: Arc<dyn IdleClassifier>,
    calendar: TraceDayCalendar,
    config: BackfillConfig,
    stop: Arc<AtomicBool>,
}

impl BackfillOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reconciler: Arc<OrphanReconciler>,
        scanner: Arc<GapScanner>,
        jobs: Arc<dyn JobRepository>,
        summarizer: Arc<dyn Summarizer>,
        classifier: Arc<dyn IdleClassifier>,
        calendar: TraceDayCalendar,
        config: BackfillConfig,
    ) -> Self {
        Self {
            reconciler,
            scanner,
            jobs,
            summarizer,
            classifier,
            calendar,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for cooperative cancellation. Checked between windows, never
    /// mid-window, so a claimed window always reaches a terminal state.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// One full orchestration run: reconcile, sweep stale claims, scan,
    /// then process at most `max` windows chronologically.
    #[instrument(skip(self))]
    pub async fn run(
        &self,
        now: DateTime<Utc>,
        force: bool,
        max: Option<usize>,
    ) -> DomainResult<BackfillReport> {
        let mut report = BackfillReport::default();

        // Repair divergence first so the scan sees a consistent picture.
        report.reconcile = self.reconciler.run_all(false).await?;

        let cutoff = now - Duration::minutes(self.config.stale_running_minutes);
        let released = self.jobs.release_stale_running(cutoff).await?;
        if released > 0 {
            warn!(released, "reopened stale running windows from a previous crash");
        }

        let budget = max.unwrap_or(self.config.max_windows_per_run);

        let missing_hours = self.scanner.find_missing_hours(now, force).await?;
        let missing_days = self.scanner.find_missing_days(now).await?;
        let day_starts: Vec<DateTime<Utc>> = missing_days
            .iter()
            .map(|d| self.calendar.day_range(*d).0)
            .collect();

        let mut windows: Vec<(JobType, DateTime<Utc>)> = missing_hours
            .into_iter()
            .map(|h| (JobType::HourSummary, h))
            .chain(day_starts.into_iter().map(|d| (JobType::DaySummary, d)))
            .collect();
        let total = windows.len();
        windows.truncate(budget);
        report.remaining = total - windows.len();

        info!(
            missing = total,
            budget,
            force,
            "backfill run starting"
        );

        for (job_type, window_start) in windows {
            if self.stop.load(Ordering::SeqCst) {
                info!("stop requested, leaving remaining windows for the next run");
                report.remaining += 1;
                continue;
            }

            match self.process_window(job_type, window_start, force).await {
                Ok(WindowOutcome::NoteProduced) => {
                    report.processed += 1;
                    report.notes_produced += 1;
                }
                Ok(WindowOutcome::Idle) => {
                    report.processed += 1;
                    report.skipped_idle += 1;
                }
                Ok(WindowOutcome::Failed) => {
                    report.processed += 1;
                    report.failed += 1;
                }
                Ok(WindowOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    // One bad window never blocks the rest of the run.
                    warn!(window = %window_start, error = %e, "window processing errored");
                    report.processed += 1;
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            notes = report.notes_produced,
            idle = report.skipped_idle,
            failed = report.failed,
            remaining = report.remaining,
            "backfill run finished"
        );
        Ok(report)
    }

    /// Drive one window to a terminal ledger state.
    async fn process_window(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        force: bool,
    ) -> DomainResult<WindowOutcome> {
        match self.jobs.get(job_type, window_start).await? {
            None => {
                self.jobs
                    .insert(&Job::new_pending(job_type, window_start))
                    .await?;
            }
            Some(job) => match job.status {
                JobStatus::Pending => {}
                JobStatus::Failed => {
                    if !self.jobs.reopen_failed(job_type, window_start).await? {
                        return Ok(WindowOutcome::Skipped);
                    }
                }
                JobStatus::Success => {
                    if force {
                        // Manual reprocessing of a settled window: the row
                        // is recreated so attempts start over.
                        self.jobs.delete(job_type, window_start).await?;
                        self.jobs
                            .insert(&Job::new_pending(job_type, window_start))
                            .await?;
                    } else {
                        return Ok(WindowOutcome::Skipped);
                    }
                }
                JobStatus::Running => {
                    debug!(window = %window_start, "window already claimed elsewhere");
                    return Ok(WindowOutcome::Skipped);
                }
            },
        }

        if !self.jobs.claim(job_type, window_start).await? {
            debug!(window = %window_start, "lost the claim race");
            return Ok(WindowOutcome::Skipped);
        }

        let request = SummarizeRequest {
            window_start,
            window_end: window_start + job_type.window_length(),
            force,
        };

        let timeout_secs = self.config.summarize_timeout_secs;
        let result = timeout(
            std::time::Duration::from_secs(timeout_secs),
            self.summarizer.summarize(request),
        )
        .await
        .map_err(|_| DomainError::SummarizerTimeout(timeout_secs))
        .and_then(|inner| inner);

        match result {
            Ok(outcome) => self.settle(job_type, window_start, outcome).await,
            Err(e) => {
                // Timeouts and transport failures are the same thing to the
                // ledger: retryable.
                self.jobs
                    .mark_failed(job_type, window_start, &e.to_string())
                    .await?;
                Ok(WindowOutcome::Failed)
            }
        }
    }

    /// Classify a summarizer reply into the terminal ledger state.
    async fn settle(
        &self,
        job_type: JobType,
        window_start: DateTime<Utc>,
        outcome: SummarizeOutcome,
    ) -> DomainResult<WindowOutcome> {
        if outcome.skipped_idle {
            let reason = outcome.idle_reason.unwrap_or_default();
            return match self.classifier.classify(&reason) {
                IdleKind::Genuine => {
                    self.jobs
                        .mark_success(
                            job_type,
                            window_start,
                            Some(json!({"skipped_idle": true, "idle_reason": reason})),
                        )
                        .await?;
                    Ok(WindowOutcome::Idle)
                }
                IdleKind::EmptyResponse => {
                    self.jobs
                        .mark_failed(
                            job_type,
                            window_start,
                            &format!("degenerate summarizer response: {reason}"),
                        )
                        .await?;
                    Ok(WindowOutcome::Failed)
                }
            };
        }

        if outcome.success {
            if let Some(note_id) = outcome.note_id {
                self.jobs
                    .mark_success(
                        job_type,
                        window_start,
                        Some(json!({"note_id": note_id, "file_path": outcome.file_path})),
                    )
                    .await?;
                return Ok(WindowOutcome::NoteProduced);
            }
            // Success without a note and without an idle flag violates the
            // summarizer contract; retry rather than settle.
            self.jobs
                .mark_failed(
                    job_type,
                    window_start,
                    "summarizer reported success without a note",
                )
                .await?;
            return Ok(WindowOutcome::Failed);
        }

        let error = outcome.error.unwrap_or_else(|| "unknown summarizer error".to_string());
        self.jobs.mark_failed(job_type, window_start, &error).await?;
        Ok(WindowOutcome::Failed)
    }
}
