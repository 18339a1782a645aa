// src/journal/mod.rs
//! Journal entries: upload, browse, search, edit, delete and chat.
//!
//! `JournalService` owns the per-user search cache. Every write drops the
//! user's cached searches before touching the store.

pub mod models;
pub mod sanitize;

pub use models::{
    AudioEntry, CacheSource, EntryPage, EntryRecord, SearchOutcome, UpdateEntry, UploadAudio,
};

use crate::ai::{
    AiServices, ChatContext, ChatMessage, ChatRole, TherapistService, TranscriptionService,
};
use crate::cache::{SearchCacheStats, SearchResultCache};
use crate::error::{ApiError, ApiResult};
use crate::monitoring::metrics;
use crate::storage::ObjectStore;
use crate::store::{collection_path, Document, DocumentStore, StoreResult};
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const ENTRIES_COLLECTION: &str = "audioEntries";
pub const SEARCH_FIELD: &str = "transcription";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;
/// Oldest chat turns beyond this are dropped before calling the model.
pub const MAX_CHAT_HISTORY: usize = 20;

pub const QUERY_REQUIRED: &str =
    "Query parameter \"q\" is required and must be a non-empty string.";
pub const THERAPIST_FALLBACK: &str =
    "I'm sorry, I'm having trouble processing your entry right now.";
pub const ENTRY_NOT_FOUND: &str = "Audio entry not found";
pub const INVALID_CURSOR: &str = "Invalid cursor.";

const KNOWN_EXTENSIONS: &[&str] = &["mp3", "m4a", "mp4", "aac", "wav", "webm", "ogg", "oga", "flac"];

pub fn entries_collection(user: &str) -> StoreResult<String> {
    collection_path(&["users", user, ENTRIES_COLLECTION])
}

/// File extension for a stored upload: the client's extension when it is a
/// known audio one, else derived from the content type.
pub fn extension_for(filename: Option<&str>, content_type: &str) -> &'static str {
    if let Some(ext) = filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
    {
        if let Some(known) = KNOWN_EXTENSIONS.iter().find(|k| **k == ext) {
            return *known;
        }
    }
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
        "audio/aac" => "aac",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => "bin",
    }
}

/// The last [`MAX_CHAT_HISTORY`] turns, starting at a user turn.
fn recent_history(history: &[ChatMessage]) -> &[ChatMessage] {
    let recent = &history[history.len().saturating_sub(MAX_CHAT_HISTORY)..];
    let first_user = recent
        .iter()
        .position(|m| m.role == ChatRole::User)
        .unwrap_or(recent.len());
    &recent[first_user..]
}

/// Convert stored documents, skipping any that no longer match the entry shape.
fn entries_from_documents(user: &str, docs: Vec<Document>) -> Vec<AudioEntry> {
    let mut entries = Vec::with_capacity(docs.len());
    for doc in docs {
        let id = doc.id.clone();
        match AudioEntry::from_document(doc) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(user_id = %user, entry_id = %id, error = %e, "skipping malformed entry"),
        }
    }
    entries
}

pub struct JournalService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn TranscriptionService>,
    therapist: Arc<dyn TherapistService>,
    cache: SearchResultCache<AudioEntry>,
    max_query_len: usize,
}

impl JournalService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        ai: AiServices,
        cache_ttl: Duration,
        max_query_len: usize,
    ) -> Self {
        Self {
            store,
            objects,
            transcriber: ai.transcription,
            therapist: ai.therapist,
            cache: SearchResultCache::new(cache_ttl),
            max_query_len,
        }
    }

    pub fn cache_stats(&self) -> SearchCacheStats {
        self.cache.stats()
    }

    pub async fn ping_store(&self) -> StoreResult<()> {
        self.store.ping().await
    }

    fn invalidate(&self, user: &str) {
        let removed = self.cache.invalidate_user(user);
        metrics::SEARCH_CACHE_INVALIDATIONS_TOTAL.inc();
        debug!(user_id = %user, removed, "user search cache dropped");
    }

    pub async fn upload(&self, user: &str, upload: UploadAudio) -> ApiResult<AudioEntry> {
        let result = self.upload_inner(user, upload).await;
        match &result {
            Ok(_) => metrics::UPLOADS_TOTAL.inc(),
            Err(_) => metrics::UPLOAD_FAILURES_TOTAL.inc(),
        }
        result
    }

    async fn upload_inner(&self, user: &str, upload: UploadAudio) -> ApiResult<AudioEntry> {
        let collection = entries_collection(user)?;
        self.invalidate(user);

        let ext = extension_for(upload.filename.as_deref(), &upload.content_type);
        let path = format!(
            "audio/{}/{}-{}.{}",
            user,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            ext
        );
        let stored = self
            .objects
            .put(&path, &upload.bytes, &upload.content_type)
            .await?;
        info!(user_id = %user, path = %stored.path, size = stored.size, "audio stored");

        let transcription = match self
            .transcriber
            .transcribe(&upload.bytes, &upload.content_type)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(user_id = %user, error = %e, "transcription failed; removing uploaded audio");
                if let Err(del) = self.objects.delete(&stored.path).await {
                    warn!(path = %stored.path, error = %del, "failed to remove orphaned audio");
                }
                return Err(e.into());
            }
        };

        let ai_response = match self.therapist.respond(&transcription).await {
            Ok(text) => text,
            Err(e) => {
                warn!(user_id = %user, error = %e, "therapist response failed; using fallback");
                THERAPIST_FALLBACK.to_string()
            }
        };

        let record = EntryRecord {
            user_id: user.to_string(),
            title: upload.title,
            audio_url: stored.url,
            storage_path: stored.path.clone(),
            tags: upload.tags,
            transcription,
            ai_response,
            created_at: Utc::now(),
        };
        let data = serde_json::to_value(&record).map_err(crate::store::StoreError::from)?;

        // Searches that ran during the AI calls may have cached results
        // without this entry.
        self.invalidate(user);
        let doc = match self.store.insert(&collection, data).await {
            Ok(doc) => doc,
            Err(e) => {
                if let Err(del) = self.objects.delete(&stored.path).await {
                    warn!(path = %stored.path, error = %del, "failed to remove orphaned audio");
                }
                return Err(e.into());
            }
        };
        info!(user_id = %user, entry_id = %doc.id, "journal entry created");
        Ok(AudioEntry {
            entry_id: doc.id,
            record,
        })
    }

    pub async fn get(&self, user: &str, entry_id: &str) -> ApiResult<AudioEntry> {
        let collection = entries_collection(user)?;
        match self.store.get(&collection, entry_id).await? {
            Some(doc) => Ok(AudioEntry::from_document(doc)?),
            None => Err(ApiError::not_found(ENTRY_NOT_FOUND)),
        }
    }

    pub async fn list(
        &self,
        user: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> ApiResult<EntryPage> {
        let collection = entries_collection(user)?;
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let start_after = match cursor.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => Some(
                c.parse::<i64>()
                    .map_err(|_| ApiError::bad_request(INVALID_CURSOR))?,
            ),
            None => None,
        };

        let mut docs = self.store.list(&collection, limit + 1, start_after).await?;
        let has_more = docs.len() > limit;
        docs.truncate(limit);

        // Store position of the last document; valid after it is deleted.
        let next_cursor = if has_more {
            docs.last().map(|d| d.seq.to_string())
        } else {
            None
        };
        Ok(EntryPage {
            entries: entries_from_documents(user, docs),
            next_cursor,
        })
    }

    pub async fn search(&self, user: &str, raw_query: &str) -> ApiResult<SearchOutcome> {
        let query = sanitize::normalize_query(raw_query, self.max_query_len)
            .ok_or_else(|| ApiError::bad_request(QUERY_REQUIRED))?;
        let collection = entries_collection(user)?;
        let started = Instant::now();

        if let Some(entries) = self.cache.lookup(user, &query) {
            metrics::SEARCH_CACHE_HITS_TOTAL.inc();
            debug!(user_id = %user, query = %query, results = entries.len(), "search served from cache");
            return Ok(SearchOutcome {
                entries,
                source: CacheSource::Hit,
            });
        }
        metrics::SEARCH_CACHE_MISSES_TOTAL.inc();

        let docs = self
            .store
            .prefix_query(&collection, SEARCH_FIELD, &query)
            .await?;
        let entries = entries_from_documents(user, docs);

        let entries = self.cache.store(user, &query, entries);
        metrics::observe_search_latency_ms(started.elapsed().as_secs_f64() * 1000.0);
        info!(user_id = %user, query = %query, results = entries.len(), "search served from store");
        Ok(SearchOutcome {
            entries,
            source: CacheSource::Miss,
        })
    }

    pub async fn update(
        &self,
        user: &str,
        entry_id: &str,
        changes: UpdateEntry,
    ) -> ApiResult<AudioEntry> {
        let collection = entries_collection(user)?;
        let mut patch = Map::new();
        if let Some(title) = changes.title {
            patch.insert(
                "title".into(),
                Value::String(sanitize::sanitize_title(Some(&title))),
            );
        }
        if let Some(tags) = changes.tags {
            let tags = sanitize::normalize_tags(tags);
            patch.insert(
                "tags".into(),
                Value::Array(tags.into_iter().map(Value::String).collect()),
            );
        }
        if patch.is_empty() {
            return Err(ApiError::bad_request("Nothing to update: provide a title or tags."));
        }

        self.invalidate(user);
        match self.store.update(&collection, entry_id, patch).await? {
            Some(doc) => {
                info!(user_id = %user, entry_id = %entry_id, "journal entry updated");
                Ok(AudioEntry::from_document(doc)?)
            }
            None => Err(ApiError::not_found(ENTRY_NOT_FOUND)),
        }
    }

    pub async fn delete(&self, user: &str, entry_id: &str) -> ApiResult<()> {
        let collection = entries_collection(user)?;
        self.invalidate(user);

        let Some(doc) = self.store.get(&collection, entry_id).await? else {
            return Err(ApiError::not_found(ENTRY_NOT_FOUND));
        };
        // Only the audio path is needed, so entries that fail to parse can
        // still be removed.
        let path = doc
            .data
            .get("storagePath")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|p| !p.is_empty());

        if !self.store.delete(&collection, entry_id).await? {
            return Err(ApiError::not_found(ENTRY_NOT_FOUND));
        }
        info!(user_id = %user, entry_id = %entry_id, "journal entry deleted");

        if let Some(path) = path {
            if let Err(e) = self.objects.delete(&path).await {
                warn!(entry_id = %entry_id, path = %path, error = %e, "entry deleted but audio removal failed");
            }
        }
        Ok(())
    }

    pub async fn chat(
        &self,
        user: &str,
        entry_id: &str,
        message: &str,
        history: &[ChatMessage],
    ) -> ApiResult<String> {
        let message = sanitize::sanitize_chat_message(message)
            .ok_or_else(|| ApiError::bad_request("Message is required."))?;
        let entry = self.get(user, entry_id).await?;

        let context = ChatContext {
            title: entry.record.title,
            transcription: entry.record.transcription,
            ai_response: entry.record.ai_response,
        };
        let history = recent_history(history);

        self.therapist
            .chat(&context, history, &message)
            .await
            .map_err(|e| {
                warn!(user_id = %user, entry_id = %entry_id, error = %e, "Failed to get chat response.");
                ApiError::from(e)
            })
    }
}
