// src/store/mod.rs
//! Document store seam.
//!
//! Documents are JSON objects addressed by a hierarchical collection path
//! (`users/{uid}/audioEntries`) and an id. The store is the source of truth
//! for journal entries; everything above it treats it as external.

pub mod sqlite_store;

pub use sqlite_store::SqliteDocumentStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid collection path: {0}")]
    InvalidPath(String),

    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Document data must be a JSON object")]
    NotAnObject,

    #[error("Store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    /// Insertion order within the store; list cursors are built from it.
    pub seq: i64,
    pub data: Value,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Liveness probe for readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Insert a new document and return it with its generated id.
    async fn insert(&self, collection: &str, data: Value) -> StoreResult<Document>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Documents whose string `field` starts with `prefix`, ordered by that field.
    async fn prefix_query(
        &self,
        collection: &str,
        field: &str,
        prefix: &str,
    ) -> StoreResult<Vec<Document>>;

    /// Newest first. `start_after` is the `seq` of the last document of the
    /// previous page; it stays valid after that document is deleted.
    async fn list(
        &self,
        collection: &str,
        limit: usize,
        start_after: Option<i64>,
    ) -> StoreResult<Vec<Document>>;

    /// Merge top-level fields of `patch` into the document. `None` when the
    /// document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<Option<Document>>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;
}

/// Build a collection path from segments, rejecting empty segments and
/// segments containing `/`.
pub fn collection_path(segments: &[&str]) -> StoreResult<String> {
    if segments.is_empty() {
        return Err(StoreError::InvalidPath(String::new()));
    }
    for segment in segments {
        if segment.is_empty() || segment.contains('/') {
            return Err(StoreError::InvalidPath(segments.join("/")));
        }
    }
    Ok(segments.join("/"))
}

pub(crate) fn validate_field(field: &str) -> StoreResult<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidField(field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path() {
        assert_eq!(
            collection_path(&["users", "alice", "audioEntries"]).unwrap(),
            "users/alice/audioEntries"
        );
        assert!(collection_path(&["users", "", "audioEntries"]).is_err());
        assert!(collection_path(&["users", "a/b", "audioEntries"]).is_err());
        assert!(collection_path(&[]).is_err());
    }

    #[test]
    fn test_validate_field() {
        assert!(validate_field("transcription").is_ok());
        assert!(validate_field("created_at").is_ok());
        assert!(validate_field("x') OR 1=1 --").is_err());
        assert!(validate_field("").is_err());
    }
}
