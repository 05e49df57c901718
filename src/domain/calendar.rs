//! Trace-day boundary arithmetic and on-disk layout derivation.
//!
//! A trace day is a 24-hour logical day that rolls over at a configurable
//! revision hour rather than at midnight. Every place the engine computes a
//! "day" (gap scanning, revision, cleanup) must go through this module;
//! calendar midnight is never a day boundary here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};

use crate::domain::models::ArtifactKind;

/// Boundary arithmetic for trace days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceDayCalendar {
    revision_hour: u32,
}

impl TraceDayCalendar {
    pub fn new(revision_hour: u32) -> Self {
        debug_assert!(revision_hour < 24);
        Self { revision_hour }
    }

    pub fn revision_hour(&self) -> u32 {
        self.revision_hour
    }

    /// Map a timestamp to its trace day. Timestamps before the revision hour
    /// belong to the previous calendar date.
    pub fn trace_day(&self, ts: DateTime<Utc>) -> NaiveDate {
        if ts.hour() < self.revision_hour {
            ts.date_naive() - Duration::days(1)
        } else {
            ts.date_naive()
        }
    }

    /// Half-open window covering a trace day: starts at `revision_hour:00:00`
    /// on `day`, ends 24 hours later.
    pub fn day_range(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc
            .with_ymd_and_hms(day.year(), day.month(), day.day(), self.revision_hour, 0, 0)
            .unwrap();
        (start, start + Duration::hours(24))
    }

    /// Truncate a timestamp to the start of its clock hour.
    pub fn hour_start(ts: DateTime<Utc>) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(ts.year(), ts.month(), ts.day(), ts.hour(), 0, 0)
            .unwrap()
    }

    /// Half-open window covering one clock hour.
    pub fn hour_range(hour_start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (hour_start, hour_start + Duration::hours(1))
    }

    /// The trace day currently accumulating at `now`.
    pub fn current_trace_day(&self, now: DateTime<Utc>) -> NaiveDate {
        self.trace_day(now)
    }

    /// All hour-starts of a trace day, in chronological order.
    pub fn hours_of_day(&self, day: NaiveDate) -> Vec<DateTime<Utc>> {
        let (start, _) = self.day_range(day);
        (0..24).map(|h| start + Duration::hours(h)).collect()
    }
}

/// Derives note and cache paths under a data root.
///
/// Cache directories are keyed by the trace day of the hour they hold, with
/// the real clock hour as the leaf: `cache/<artifact>/<YYYYMMDD>/<HH>/`.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
    calendar: TraceDayCalendar,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, calendar: TraceDayCalendar) -> Self {
        Self { root: root.into(), calendar }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn calendar(&self) -> TraceDayCalendar {
        self.calendar
    }

    pub fn notes_root(&self) -> PathBuf {
        self.root.join("notes")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Directory holding all note files for a trace day.
    pub fn notes_dir(&self, day: NaiveDate) -> PathBuf {
        self.notes_root().join(day.format("%Y-%m-%d").to_string())
    }

    /// Canonical path for an hour note's markdown rendering.
    pub fn hour_note_path(&self, hour_start: DateTime<Utc>) -> PathBuf {
        let day = self.calendar.trace_day(hour_start);
        self.notes_dir(day)
            .join(format!("hour_{}.md", hour_start.format("%Y-%m-%dT%H")))
    }

    /// Canonical path for a day note's markdown rendering.
    pub fn day_note_path(&self, day: NaiveDate) -> PathBuf {
        self.notes_dir(day).join(format!("day_{}.md", day.format("%Y-%m-%d")))
    }

    /// Root directory for one artifact kind's cache.
    pub fn cache_kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.cache_root().join(kind.as_str())
    }

    /// Cache date directory for an artifact kind and trace day.
    pub fn cache_day_dir(&self, kind: ArtifactKind, day: NaiveDate) -> PathBuf {
        self.cache_kind_dir(kind).join(day.format("%Y%m%d").to_string())
    }

    /// Cache directory for one clock hour of a trace day.
    pub fn cache_hour_dir(&self, kind: ArtifactKind, hour_start: DateTime<Utc>) -> PathBuf {
        let day = self.calendar.trace_day(hour_start);
        self.cache_day_dir(kind, day).join(format!("{:02}", hour_start.hour()))
    }

    /// Reverse of `cache_hour_dir`: recover the hour-start from a
    /// `<YYYYMMDD>/<HH>` directory pair. The date component is a trace day,
    /// so hours before the revision hour belong to the following calendar
    /// date.
    pub fn hour_from_cache_dir(&self, day_dir: &str, hour_dir: &str) -> Option<DateTime<Utc>> {
        let day = NaiveDate::parse_from_str(day_dir, "%Y%m%d").ok()?;
        let hour: u32 = hour_dir.parse().ok()?;
        if hour >= 24 {
            return None;
        }
        let date = if hour < self.calendar.revision_hour {
            day + Duration::days(1)
        } else {
            day
        };
        Utc.with_ymd_and_hms(date.year(), date.month(), date.day(), hour, 0, 0)
            .single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn trace_day_before_revision_hour_is_previous_date() {
        let cal = TraceDayCalendar::new(3);
        assert_eq!(
            cal.trace_day(ts("2026-01-29T02:00:00Z")),
            NaiveDate::from_ymd_opt(2026, 1, 28).unwrap()
        );
        assert_eq!(
            cal.trace_day(ts("2026-01-29T03:00:00Z")),
            NaiveDate::from_ymd_opt(2026, 1, 29).unwrap()
        );
    }

    #[test]
    fn day_range_is_24h_starting_at_revision_hour() {
        let cal = TraceDayCalendar::new(4);
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let (start, end) = cal.day_range(day);
        assert_eq!(start, ts("2026-03-10T04:00:00Z"));
        assert_eq!(end, ts("2026-03-11T04:00:00Z"));
    }

    #[test]
    fn hour_start_truncates_minutes_and_seconds() {
        assert_eq!(
            TraceDayCalendar::hour_start(ts("2026-01-29T02:45:31Z")),
            ts("2026-01-29T02:00:00Z")
        );
    }

    #[test]
    fn hours_of_day_crosses_midnight() {
        let cal = TraceDayCalendar::new(4);
        let day = NaiveDate::from_ymd_opt(2026, 1, 28).unwrap();
        let hours = cal.hours_of_day(day);
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0], ts("2026-01-28T04:00:00Z"));
        assert_eq!(hours[23], ts("2026-01-29T03:00:00Z"));
        // Every hour of the day maps back to the same trace day.
        for h in hours {
            assert_eq!(cal.trace_day(h), day);
        }
    }

    #[test]
    fn cache_hour_dir_uses_trace_day_date() {
        let cal = TraceDayCalendar::new(4);
        let layout = DataLayout::new("/data", cal);
        // 02:00 belongs to the previous trace day's directory.
        let dir = layout.cache_hour_dir(ArtifactKind::Screenshots, ts("2026-01-29T02:00:00Z"));
        assert_eq!(dir, PathBuf::from("/data/cache/screenshots/20260128/02"));
        let dir = layout.cache_hour_dir(ArtifactKind::Screenshots, ts("2026-01-29T05:00:00Z"));
        assert_eq!(dir, PathBuf::from("/data/cache/screenshots/20260129/05"));
    }

    #[test]
    fn hour_from_cache_dir_round_trips() {
        let cal = TraceDayCalendar::new(4);
        let layout = DataLayout::new("/data", cal);
        let hour = layout.hour_from_cache_dir("20260128", "02").unwrap();
        assert_eq!(hour, ts("2026-01-29T02:00:00Z"));
        let hour = layout.hour_from_cache_dir("20260128", "05").unwrap();
        assert_eq!(hour, ts("2026-01-28T05:00:00Z"));
        assert!(layout.hour_from_cache_dir("20260128", "24").is_none());
        assert!(layout.hour_from_cache_dir("garbage", "05").is_none());
    }

    proptest! {
        #[test]
        fn day_range_contains_every_timestamp_of_its_trace_day(
            secs in 0i64..4_102_444_800, // up to year 2100
            revision_hour in 0u32..24,
        ) {
            let cal = TraceDayCalendar::new(revision_hour);
            let t = Utc.timestamp_opt(secs, 0).single().unwrap();
            let day = cal.trace_day(t);
            let (start, end) = cal.day_range(day);
            prop_assert!(start <= t && t < end);
        }

        #[test]
        fn hour_start_is_idempotent(secs in 0i64..4_102_444_800) {
            let t = Utc.timestamp_opt(secs, 0).single().unwrap();
            let h = TraceDayCalendar::hour_start(t);
            prop_assert_eq!(TraceDayCalendar::hour_start(h), h);
            prop_assert!(h <= t);
        }

        #[test]
        fn cache_dir_round_trip(
            secs in 0i64..4_102_444_800,
            revision_hour in 0u32..24,
        ) {
            let cal = TraceDayCalendar::new(revision_hour);
            let layout = DataLayout::new("/data", cal);
            let hour = TraceDayCalendar::hour_start(Utc.timestamp_opt(secs, 0).single().unwrap());
            let day = cal.trace_day(hour).format("%Y%m%d").to_string();
            let hh = format!("{:02}", hour.hour());
            prop_assert_eq!(layout.hour_from_cache_dir(&day, &hh), Some(hour));
        }
    }
}
