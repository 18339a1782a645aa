// src/journal/models.rs
use crate::store::{Document, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stored fields of a journal entry (everything except the document id).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryRecord {
    pub user_id: String,
    pub title: String,
    pub audio_url: String,
    pub storage_path: String,
    pub tags: Vec<String>,
    pub transcription: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEntry {
    #[serde(rename = "entryId")]
    pub entry_id: String,
    #[serde(flatten)]
    pub record: EntryRecord,
}

impl AudioEntry {
    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        let record: EntryRecord = serde_json::from_value(doc.data)?;
        Ok(Self {
            entry_id: doc.id,
            record,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPage {
    pub entries: Vec<AudioEntry>,
    pub next_cursor: Option<String>,
}

/// A fully received upload, ready to relay to storage.
#[derive(Debug, Clone)]
pub struct UploadAudio {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: String,
    pub title: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEntry {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Hit,
    Miss,
}

impl CacheSource {
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheSource::Hit => "HIT",
            CacheSource::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub entries: Arc<Vec<AudioEntry>>,
    pub source: CacheSource,
}
