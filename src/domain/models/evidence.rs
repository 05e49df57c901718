//! Raw evidence models: screenshots, input events, and text buffers.
//!
//! Evidence rows are written by the capture daemon; the engine only reads
//! them for gap detection, reconciles them against disk, and deletes the
//! raw-payload kinds after a day passes its integrity checkpoint.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of raw cache artifacts kept on disk under `cache/<kind>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Screenshots,
    TextBuffers,
    OcrText,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screenshots => "screenshots",
            Self::TextBuffers => "text",
            Self::OcrText => "ocr",
        }
    }

    /// All kinds, in the order cleanup walks them.
    pub fn all() -> [ArtifactKind; 3] {
        [Self::Screenshots, Self::TextBuffers, Self::OcrText]
    }
}

/// One captured screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub monitor_id: String,
    pub path: String,
    /// Perceptual hash of the frame
    pub fingerprint: String,
    /// Distance from the previous frame on the same monitor
    pub diff_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Screenshot {
    pub fn new(
        ts: DateTime<Utc>,
        monitor_id: impl Into<String>,
        path: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts,
            monitor_id: monitor_id.into(),
            path: path.into(),
            fingerprint: fingerprint.into(),
            diff_score: None,
            created_at: Utc::now(),
        }
    }

    /// File name the capture daemon writes: `<YYYYMMDDTHHMMSS>_<monitor>_<fingerprint>.png`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.png",
            self.ts.format("%Y%m%dT%H%M%S"),
            self.monitor_id,
            self.fingerprint
        )
    }
}

/// Parse the capture daemon's screenshot file name convention back into
/// (timestamp, monitor id, fingerprint). Returns `None` for files that do
/// not follow the convention; the reconciler skips those.
pub fn parse_screenshot_file_name(name: &str) -> Option<(DateTime<Utc>, String, String)> {
    let stem = name.strip_suffix(".png")?;
    let mut parts = stem.splitn(3, '_');
    let ts_part = parts.next()?;
    let monitor = parts.next()?;
    let fingerprint = parts.next()?;
    if monitor.is_empty() || fingerprint.is_empty() {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(ts_part, "%Y%m%dT%H%M%S").ok()?;
    Some((naive.and_utc(), monitor.to_string(), fingerprint.to_string()))
}

/// One window/input event. Carries no raw payload, so cleanup retains these
/// rows as durable history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub kind: String,
    pub app_name: Option<String>,
    pub window_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(ts: DateTime<Utc>, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts,
            kind: kind.into(),
            app_name: None,
            window_title: None,
            created_at: Utc::now(),
        }
    }
}

/// One captured text buffer file on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBuffer {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub path: String,
    pub bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl TextBuffer {
    pub fn new(ts: DateTime<Utc>, path: impl Into<String>, bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts,
            path: path.into(),
            bytes,
            created_at: Utc::now(),
        }
    }
}
