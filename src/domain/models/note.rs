//! Note domain model.
//!
//! A note is the durable artifact derived from one hour or one day of
//! captured activity. The JSON payload is the source of truth; the markdown
//! file at `file_path` is a rendering of it with an identity header that
//! allows a lost datastore row to be reconstructed from disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Granularity of a note's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Hour,
    Day,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            _ => None,
        }
    }
}

/// A durable summary of one window of activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier, stable across revisions
    pub id: Uuid,
    /// Hour or day granularity
    pub note_type: NoteType,
    /// Window start (inclusive)
    pub start_ts: DateTime<Utc>,
    /// Window end (exclusive)
    pub end_ts: DateTime<Utc>,
    /// Markdown rendering on disk
    pub file_path: String,
    /// Structured summary, source of truth for re-rendering
    pub json_payload: serde_json::Value,
    /// Optional link to a search vector
    pub embedding_id: Option<Uuid>,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last revised
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(
        note_type: NoteType,
        start_ts: DateTime<Utc>,
        end_ts: DateTime<Utc>,
        file_path: impl Into<String>,
        json_payload: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            note_type,
            start_ts,
            end_ts,
            file_path: file_path.into(),
            json_payload,
            embedding_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of non-trivial activities in the payload. Used to decide
    /// whether a note is a placeholder.
    pub fn activity_count(&self) -> usize {
        self.json_payload
            .get("activities")
            .and_then(|a| a.as_array())
            .map(|a| {
                a.iter()
                    .filter(|entry| {
                        entry
                            .get("title")
                            .and_then(|t| t.as_str())
                            .is_some_and(|t| !t.trim().is_empty())
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    /// The summary text of the payload, if present.
    pub fn summary_text(&self) -> Option<&str> {
        self.json_payload.get("summary").and_then(|s| s.as_str())
    }

    /// Identity header for the note's markdown file.
    pub fn header(&self) -> NoteHeader {
        NoteHeader {
            id: self.id,
            note_type: self.note_type,
            start_ts: self.start_ts,
            end_ts: self.end_ts,
        }
    }
}

/// YAML front-matter identity block carried at the top of every note file.
///
/// The header is what makes note files self-describing: if the datastore
/// loses the row, the reconciler re-indexes the file from this block alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHeader {
    pub id: Uuid,
    pub note_type: NoteType,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
}

impl NoteHeader {
    /// Parse the front-matter block from a note file's contents.
    ///
    /// Expects the document to open with a `---` fence, followed by YAML,
    /// closed by another `---` fence.
    pub fn from_markdown(document: &str) -> Option<Self> {
        let rest = document.strip_prefix("---")?;
        let end = rest.find("\n---")?;
        serde_yaml::from_str(&rest[..end]).ok()
    }

    /// Render a full note document: front matter followed by the body.
    pub fn to_markdown(&self, body: &str) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        format!("---\n{yaml}---\n\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn header_round_trips_through_markdown() {
        let header = NoteHeader {
            id: Uuid::new_v4(),
            note_type: NoteType::Hour,
            start_ts: ts("2026-01-29T02:00:00Z"),
            end_ts: ts("2026-01-29T03:00:00Z"),
        };
        let doc = header.to_markdown("Worked on the parser.");
        let parsed = NoteHeader::from_markdown(&doc).unwrap();
        assert_eq!(parsed, header);
        assert!(doc.contains("Worked on the parser."));
    }

    #[test]
    fn from_markdown_rejects_documents_without_front_matter() {
        assert!(NoteHeader::from_markdown("# Just a heading\n\ntext").is_none());
        assert!(NoteHeader::from_markdown("---\nid: not yaml that parses\n").is_none());
    }

    #[test]
    fn activity_count_ignores_untitled_entries() {
        let mut note = Note::new(
            NoteType::Hour,
            ts("2026-01-29T02:00:00Z"),
            ts("2026-01-29T03:00:00Z"),
            "/tmp/n.md",
            json!({
                "summary": "Editing and review",
                "activities": [
                    {"title": "Edited report"},
                    {"title": "   "},
                    {"detail": "no title"},
                ]
            }),
        );
        assert_eq!(note.activity_count(), 1);

        note.json_payload = json!({"summary": "No activity detected"});
        assert_eq!(note.activity_count(), 0);
    }
}
