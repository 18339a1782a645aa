// src/storage/mod.rs
// Blob storage seam for uploaded audio

pub mod local;

pub use local::LocalObjectStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct ObjectData {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path`, returning a retrievable URL.
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    async fn get(&self, path: &str) -> Result<ObjectData, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Reject absolute paths, `..`, empty segments and backslashes.
pub fn validate_object_path(path: &str) -> Result<(), StorageError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StorageError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

/// Content type from a file extension, for audio formats we accept.
pub fn audio_content_type_for(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
    let ct = match ext.as_str() {
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "wav" => "audio/wav",
        "webm" => "audio/webm",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        _ => return None,
    };
    Some(ct)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_path() {
        assert!(validate_object_path("audio/alice/1700000000000-abc.mp3").is_ok());
        assert!(validate_object_path("../etc/passwd").is_err());
        assert!(validate_object_path("/abs/path").is_err());
        assert!(validate_object_path("audio//x").is_err());
        assert!(validate_object_path("audio\\x").is_err());
        assert!(validate_object_path("").is_err());
    }

    #[test]
    fn test_audio_content_type_for() {
        assert_eq!(audio_content_type_for("a/b.MP3"), Some("audio/mpeg"));
        assert_eq!(audio_content_type_for("clip.m4a"), Some("audio/mp4"));
        assert_eq!(audio_content_type_for("notes.txt"), None);
        assert_eq!(audio_content_type_for("noext"), None);
    }
}
