//! Gap detection: which hours and days of real activity still lack a note.
//!
//! Three evidence sources are unioned (screenshot rows, event rows, on-disk
//! cache directories) so an outage of any single one cannot hide activity.
//! A non-orphan note is always definitive proof of completion and wins over
//! whatever the ledger says; the ledger's `success` is trusted otherwise.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::domain::calendar::{DataLayout, TraceDayCalendar};
use crate::domain::errors::DomainResult;
use crate::domain::models::{ArtifactKind, Note, JobStatus, JobType, NoteType, ScanConfig};
use crate::domain::ports::{EventRepository, JobRepository, NoteRepository, ScreenshotRepository};

pub struct GapScanner {
    screenshots: Arc<dyn ScreenshotRepository>,
    events: Arc<dyn EventRepository>,
    notes: Arc<dyn NoteRepository>,
    jobs: Arc<dyn JobRepository>,
    layout: DataLayout,
    config: ScanConfig,
}

/// Whether a note row's backing file is present. Orphan rows never count
/// as proof of completion.
pub fn note_file_exists(note: &Note) -> bool {
    Path::new(&note.file_path).is_file()
}

impl GapScanner {
    pub fn new(
        screenshots: Arc<dyn ScreenshotRepository>,
        events: Arc<dyn EventRepository>,
        notes: Arc<dyn NoteRepository>,
        jobs: Arc<dyn JobRepository>,
        layout: DataLayout,
        config: ScanConfig,
    ) -> Self {
        Self {
            screenshots,
            events,
            notes,
            jobs,
            layout,
            config,
        }
    }

    /// Hours of past activity with no note, oldest first.
    ///
    /// `ignore_ledger` drops the `success` shortcut so manual reprocessing
    /// can re-offer already-settled windows; the definitive note check
    /// still applies.
    pub async fn find_missing_hours(
        &self,
        now: DateTime<Utc>,
        ignore_ledger: bool,
    ) -> DomainResult<Vec<DateTime<Utc>>> {
        let current_hour = TraceDayCalendar::hour_start(now);

        let mut candidates: BTreeSet<DateTime<Utc>> = BTreeSet::new();
        candidates.extend(self.screenshots.distinct_hours().await?);
        candidates.extend(self.events.distinct_hours().await?);
        candidates.extend(self.on_disk_screenshot_hours());

        let settled: BTreeSet<DateTime<Utc>> = if ignore_ledger {
            BTreeSet::new()
        } else {
            self.jobs
                .windows_with_status(JobType::HourSummary, JobStatus::Success)
                .await?
                .into_iter()
                .collect()
        };

        let mut missing = Vec::new();
        for hour in candidates {
            // The current hour is still accumulating evidence.
            if hour >= current_hour {
                continue;
            }

            match self.notes.get_by_window(NoteType::Hour, hour).await {
                Ok(Some(note)) if note_file_exists(&note) => continue,
                Ok(Some(note)) => {
                    debug!(hour = %hour, file = %note.file_path, "orphan note row does not settle the hour");
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(hour = %hour, error = %e, "note lookup failed, skipping hour this scan");
                    continue;
                }
            }

            if settled.contains(&hour) {
                continue;
            }

            match self.hour_has_enough_evidence(hour).await {
                Ok(true) => missing.push(hour),
                Ok(false) => {
                    debug!(hour = %hour, "below evidence threshold, not enqueueing");
                }
                Err(e) => {
                    warn!(hour = %hour, error = %e, "evidence count failed, skipping hour this scan");
                }
            }
        }

        Ok(missing)
    }

    /// Trace days that have hour notes but no day note, oldest first.
    pub async fn find_missing_days(&self, now: DateTime<Utc>) -> DomainResult<Vec<NaiveDate>> {
        let calendar = self.layout.calendar();
        let current_day = calendar.trace_day(now);

        let days: BTreeSet<NaiveDate> = self
            .notes
            .window_starts(NoteType::Hour)
            .await?
            .into_iter()
            .map(|h| calendar.trace_day(h))
            .collect();

        let mut missing = Vec::new();
        for day in days {
            if day >= current_day {
                continue;
            }

            let (day_start, _) = calendar.day_range(day);
            match self.notes.get_by_window(NoteType::Day, day_start).await {
                Ok(Some(note)) if note_file_exists(&note) => continue,
                Ok(Some(_)) | Ok(None) => {}
                Err(e) => {
                    warn!(day = %day, error = %e, "day note lookup failed, skipping day this scan");
                    continue;
                }
            }

            // A success row without an actual day note is a lie; the day
            // stays missing.
            if let Ok(Some(job)) = self.jobs.get(JobType::DaySummary, day_start).await {
                if job.status == JobStatus::Success {
                    warn!(day = %day, "ledger claims success but no day note exists, re-offering");
                }
            }

            missing.push(day);
        }

        Ok(missing)
    }

    /// Hour-starts derived from the screenshot cache directory tree.
    fn on_disk_screenshot_hours(&self) -> Vec<DateTime<Utc>> {
        let mut hours = Vec::new();
        let root = self.layout.cache_kind_dir(ArtifactKind::Screenshots);
        let Ok(day_dirs) = std::fs::read_dir(&root) else {
            return hours;
        };

        for day_entry in day_dirs.flatten() {
            if !day_entry.path().is_dir() {
                continue;
            }
            let day_name = day_entry.file_name().to_string_lossy().into_owned();
            let Ok(hour_dirs) = std::fs::read_dir(day_entry.path()) else {
                continue;
            };
            for hour_entry in hour_dirs.flatten() {
                if !hour_entry.path().is_dir() {
                    continue;
                }
                let hour_name = hour_entry.file_name().to_string_lossy().into_owned();
                match self.layout.hour_from_cache_dir(&day_name, &hour_name) {
                    Some(hour) => hours.push(hour),
                    None => debug!(dir = %hour_entry.path().display(), "unrecognized cache directory name"),
                }
            }
        }
        hours
    }

    /// Count of screenshot files actually present for an hour.
    fn on_disk_screenshot_count(&self, hour: DateTime<Utc>) -> usize {
        let dir = self.layout.cache_hour_dir(ArtifactKind::Screenshots, hour);
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().is_file())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Evidence threshold: enough screenshot files alone, or enough
    /// combined screenshots and events. Hours below both floors are
    /// evidence-free and never enqueued.
    async fn hour_has_enough_evidence(&self, hour: DateTime<Utc>) -> DomainResult<bool> {
        let screenshot_files = self.on_disk_screenshot_count(hour);
        if screenshot_files >= self.config.min_screenshot_files {
            return Ok(true);
        }

        let (start, end) = TraceDayCalendar::hour_range(hour);
        let events = usize::try_from(self.events.count_in(start, end).await?).unwrap_or(0);
        Ok(screenshot_files + events >= self.config.min_combined_evidence)
    }
}
