//! Entity graph models.
//!
//! Entities, edges, and note-entity links are produced by the aggregation
//! collaborator. The engine only validates them (integrity checkpoint) and
//! cascades them when a note row is removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: kind.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(source_id: Uuid, target_id: Uuid, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            kind: kind.into(),
            created_at: Utc::now(),
        }
    }
}

/// Search vector attached to a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub id: Uuid,
    pub note_id: Uuid,
    pub dim: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    pub fn new(note_id: Uuid, dim: u32, vector: Option<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            note_id,
            dim,
            vector,
            created_at: Utc::now(),
        }
    }
}
