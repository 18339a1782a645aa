// tests/common/mod.rs
// In-process doubles shared by the HTTP integration tests.
#![allow(dead_code)]

use actix_web::web;
use async_trait::async_trait;
use audio_journal::ai::{
    AiError, AiServices, ChatContext, ChatMessage, MockAiProvider, TherapistService,
    TranscriptionService,
};
use audio_journal::api::AppState;
use audio_journal::auth::{IdentityProvider, StaticTokenVerifier};
use audio_journal::journal::JournalService;
use audio_journal::storage::{LocalObjectStore, ObjectData, ObjectStore, StorageError, StoredObject};
use audio_journal::store::{Document, DocumentStore, SqliteDocumentStore, StoreResult};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const ALICE: &str = "Bearer alice-token";
pub const BOB: &str = "Bearer bob-token";
pub const BOUNDARY: &str = "----journal-test-boundary";

/// SQLite store that counts the calls the cache is meant to absorb.
pub struct CountingStore {
    inner: SqliteDocumentStore,
    pub prefix_queries: AtomicUsize,
    pub calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteDocumentStore::open_in_memory().unwrap(),
            prefix_queries: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn prefix_query_count(&self) -> usize {
        self.prefix_queries.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn insert(&self, collection: &str, data: Value) -> StoreResult<Document> {
        self.tick();
        self.inner.insert(collection, data).await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.tick();
        self.inner.get(collection, id).await
    }

    async fn prefix_query(
        &self,
        collection: &str,
        field: &str,
        prefix: &str,
    ) -> StoreResult<Vec<Document>> {
        self.tick();
        self.prefix_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.prefix_query(collection, field, prefix).await
    }

    async fn list(
        &self,
        collection: &str,
        limit: usize,
        start_after: Option<i64>,
    ) -> StoreResult<Vec<Document>> {
        self.tick();
        self.inner.list(collection, limit, start_after).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<Option<Document>> {
        self.tick();
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.tick();
        self.inner.delete(collection, id).await
    }
}

/// Local disk store whose deletes can be made to fail.
pub struct FlakyObjectStore {
    inner: LocalObjectStore,
    pub fail_deletes: AtomicBool,
    pub deletes: AtomicUsize,
}

#[async_trait]
impl ObjectStore for FlakyObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        self.inner.put(path, bytes, content_type).await
    }

    async fn get(&self, path: &str) -> Result<ObjectData, StorageError> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("simulated outage".into()));
        }
        self.inner.delete(path).await
    }
}

pub struct FailingTranscriber;

#[async_trait]
impl TranscriptionService for FailingTranscriber {
    async fn transcribe(&self, _audio: &[u8], _mime_type: &str) -> Result<String, AiError> {
        Err(AiError::Provider {
            status: 503,
            body: "overloaded".into(),
        })
    }
}

pub struct FailingTherapist;

#[async_trait]
impl TherapistService for FailingTherapist {
    async fn respond(&self, _transcription: &str) -> Result<String, AiError> {
        Err(AiError::Timeout)
    }

    async fn chat(
        &self,
        _context: &ChatContext,
        _history: &[ChatMessage],
        _message: &str,
    ) -> Result<String, AiError> {
        Err(AiError::Timeout)
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

pub fn mock_ai(transcription: &str) -> AiServices {
    let mock = Arc::new(MockAiProvider {
        transcription: transcription.to_string(),
        response: "That sounds restorative.".to_string(),
    });
    AiServices {
        transcription: mock.clone(),
        therapist: mock,
    }
}

pub struct TestEnv {
    pub state: web::Data<AppState>,
    pub identity: web::Data<dyn IdentityProvider>,
    pub store: Arc<CountingStore>,
    pub objects: Arc<FlakyObjectStore>,
    _media: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_ai(mock_ai("nature walk through the pines"))
    }

    pub fn with_ai(ai: AiServices) -> Self {
        Self::build(ai, 1024 * 1024)
    }

    pub fn build(ai: AiServices, max_upload_bytes: usize) -> Self {
        let media = tempfile::tempdir().unwrap();
        let store = Arc::new(CountingStore::new());
        let objects = Arc::new(FlakyObjectStore {
            inner: LocalObjectStore::new(media.path(), "http://localhost:5000").unwrap(),
            fail_deletes: AtomicBool::new(false),
            deletes: AtomicUsize::new(0),
        });
        let journal = JournalService::new(
            store.clone(),
            objects.clone(),
            ai,
            Duration::from_secs(60),
            100,
        );
        let state = web::Data::new(AppState::new(journal, objects.clone(), max_upload_bytes));
        let identity: Arc<dyn IdentityProvider> = Arc::new(StaticTokenVerifier::new([
            ("alice-token", "alice"),
            ("bob-token", "bob"),
        ]));
        Self {
            state,
            identity: web::Data::from(identity),
            store,
            objects,
            _media: media,
        }
    }

    /// Insert an entry directly, bypassing the service and its cache.
    pub async fn seed(&self, user: &str, title: &str, transcription: &str) -> String {
        let collection = format!("users/{}/audioEntries", user);
        let doc = self
            .store
            .inner
            .insert(
                &collection,
                json!({
                    "userId": user,
                    "title": title,
                    "transcription": transcription,
                    "aiResponse": "noted",
                    "tags": [],
                    "createdAt": "2026-01-01T00:00:00Z",
                }),
            )
            .await
            .unwrap();
        doc.id
    }

    /// Insert arbitrary document data, including shapes the service rejects.
    pub async fn seed_raw(&self, user: &str, data: Value) -> String {
        let collection = format!("users/{}/audioEntries", user);
        self.store.inner.insert(&collection, data).await.unwrap().id
    }

    pub async fn document_exists(&self, user: &str, id: &str) -> bool {
        let collection = format!("users/{}/audioEntries", user);
        self.store.inner.get(&collection, id).await.unwrap().is_some()
    }

    /// Seed an entry whose audio exists in the object store.
    pub async fn seed_with_audio(&self, user: &str, transcription: &str) -> (String, String) {
        let path = format!("audio/{}/1-seed.webm", user);
        let stored = self.objects.put(&path, b"RIFFdata", "audio/webm").await.unwrap();
        let collection = format!("users/{}/audioEntries", user);
        let doc = self
            .store
            .inner
            .insert(
                &collection,
                json!({
                    "userId": user,
                    "title": "Seeded",
                    "transcription": transcription,
                    "storagePath": stored.path,
                    "audioUrl": stored.url,
                }),
            )
            .await
            .unwrap();
        (doc.id, path)
    }
}

/// Build an actix test service over the journal routes.
#[macro_export]
macro_rules! test_app {
    ($env:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($env.state.clone())
                .app_data($env.identity.clone())
                .configure(audio_journal::api::configure),
        )
        .await
    };
}

pub fn multipart_body(fields: &[(&str, &str)], audio: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = audio {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
