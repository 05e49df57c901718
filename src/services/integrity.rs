//! Integrity checkpoint: read-only validation of one trace day's notes and
//! graph before raw evidence may be deleted.
//!
//! Errors block deletion; warnings do not. The pass never mutates state so
//! it can be called speculatively.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::calendar::DataLayout;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Note, NoteHeader, NoteType};
use crate::domain::ports::{GraphRepository, NoteRepository};

/// Result of one integrity pass.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IntegrityReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl IntegrityReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

pub struct IntegrityChecker {
    notes: Arc<dyn NoteRepository>,
    graph: Arc<dyn GraphRepository>,
    layout: DataLayout,
}

impl IntegrityChecker {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        graph: Arc<dyn GraphRepository>,
        layout: DataLayout,
    ) -> Self {
        Self { notes, graph, layout }
    }

    #[instrument(skip(self))]
    pub async fn check(
        &self,
        day: NaiveDate,
        require_embeddings: bool,
        require_day_note: bool,
    ) -> DomainResult<IntegrityReport> {
        let mut report = IntegrityReport::default();
        let calendar = self.layout.calendar();
        let (start, end) = calendar.day_range(day);

        let hour_notes = self.notes.list_in_range(NoteType::Hour, start, end).await?;
        for note in &hour_notes {
            self.check_note_file(note, &mut report);
            self.check_payload(note, &mut report);
        }

        let day_note = self.notes.get_by_window(NoteType::Day, start).await?;
        match &day_note {
            Some(note) => {
                self.check_note_file(note, &mut report);
                self.check_payload(note, &mut report);
            }
            None if !hour_notes.is_empty() => {
                let message = format!("day {day} has {} hour notes but no day note", hour_notes.len());
                if require_day_note {
                    report.error(message);
                } else {
                    report.warning(message);
                }
            }
            None => {}
        }

        let mut entity_ids: Vec<Uuid> = Vec::new();
        for note in hour_notes.iter().chain(day_note.iter()) {
            self.check_links(note, &mut entity_ids, &mut report).await?;
            self.check_embedding(note, require_embeddings, &mut report).await?;
        }

        entity_ids.sort();
        entity_ids.dedup();
        self.check_edges(&entity_ids, &mut report).await?;

        Ok(report)
    }

    fn check_note_file(&self, note: &Note, report: &mut IntegrityReport) {
        let path = Path::new(&note.file_path);
        if !path.is_file() {
            report.error(format!(
                "{} note {} file missing: {}",
                note.note_type.as_str(),
                note.id,
                note.file_path
            ));
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(document) => {
                if NoteHeader::from_markdown(&document).is_none() {
                    report.error(format!(
                        "{} note {} file has no parseable identity header",
                        note.note_type.as_str(),
                        note.id
                    ));
                }
            }
            Err(e) => report.error(format!(
                "{} note {} file unreadable: {e}",
                note.note_type.as_str(),
                note.id
            )),
        }
    }

    fn check_payload(&self, note: &Note, report: &mut IntegrityReport) {
        if !note.json_payload.is_object() {
            report.error(format!(
                "{} note {} payload is not a JSON object",
                note.note_type.as_str(),
                note.id
            ));
        }
    }

    async fn check_links(
        &self,
        note: &Note,
        entity_ids: &mut Vec<Uuid>,
        report: &mut IntegrityReport,
    ) -> DomainResult<()> {
        for entity_id in self.graph.entity_ids_for_note(note.id).await? {
            if self.graph.entity_exists(entity_id).await? {
                entity_ids.push(entity_id);
            } else {
                report.error(format!(
                    "note {} links to missing entity {entity_id}",
                    note.id
                ));
            }
        }
        Ok(())
    }

    async fn check_embedding(
        &self,
        note: &Note,
        require_embeddings: bool,
        report: &mut IntegrityReport,
    ) -> DomainResult<()> {
        match note.embedding_id {
            Some(embedding_id) => {
                if !self.graph.embedding_exists(embedding_id).await? {
                    report.error(format!(
                        "note {} references missing embedding {embedding_id}",
                        note.id
                    ));
                }
            }
            None => {
                let message = format!("note {} has no embedding", note.id);
                if require_embeddings {
                    report.error(message);
                } else {
                    report.warning(message);
                }
            }
        }
        Ok(())
    }

    async fn check_edges(
        &self,
        entity_ids: &[Uuid],
        report: &mut IntegrityReport,
    ) -> DomainResult<()> {
        for edge in self.graph.edges_touching(entity_ids).await? {
            for endpoint in [edge.source_id, edge.target_id] {
                if !self.graph.entity_exists(endpoint).await? {
                    report.error(format!(
                        "edge {} has missing endpoint entity {endpoint}",
                        edge.id
                    ));
                }
            }
        }
        Ok(())
    }
}
