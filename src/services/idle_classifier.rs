//! String heuristics over summarizer output.
//!
//! Two closed phrase lists live here: one telling a genuinely idle window
//! apart from an empty upstream response, one recognizing placeholder note
//! content. Both are deliberately behind small seams so a structured flag
//! from the summarizer can replace them without touching the state machine.

use crate::domain::models::Note;
use crate::domain::ports::{IdleClassifier, IdleKind};

/// Idle reasons containing any of these markers describe a degenerate
/// upstream response, not a quiet hour. Matching is case-insensitive.
const EMPTY_RESPONSE_MARKERS: &[&str] = &[
    "no meaningful content",
    "empty response",
    "empty completion",
    "no content returned",
    "blank response",
    "placeholder",
];

/// Default reason classification: substring match against the marker list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseIdleClassifier;

impl IdleClassifier for PhraseIdleClassifier {
    fn classify(&self, idle_reason: &str) -> IdleKind {
        let lowered = idle_reason.to_lowercase();
        if EMPTY_RESPONSE_MARKERS.iter().any(|m| lowered.contains(m)) {
            IdleKind::EmptyResponse
        } else {
            IdleKind::Genuine
        }
    }
}

/// Summary phrases that mark a note as carrying no real content.
const PLACEHOLDER_NOTE_PHRASES: &[&str] = &[
    "no activity",
    "no significant activity",
    "insufficient evidence",
    "nothing to report",
    "nothing to summarize",
    "placeholder",
];

/// A note is a placeholder when its summary matches the closed phrase list
/// AND it records zero non-trivial activities. Either signal alone is not
/// enough: a real summary can mention "no activity" in passing, and an
/// activity-free note with a substantive summary is kept.
pub fn is_placeholder_note(note: &Note) -> bool {
    if note.activity_count() > 0 {
        return false;
    }
    let Some(summary) = note.summary_text() else {
        // No summary text and no activities: nothing worth keeping.
        return true;
    };
    let lowered = summary.to_lowercase();
    PLACEHOLDER_NOTE_PHRASES.iter().any(|p| lowered.contains(p))
}
