// src/api/upload.rs
// Multipart intake: the audio part streams into a temp file, text parts are
// collected in memory with a small cap.

use crate::error::{ApiError, ApiResult};
use crate::journal::sanitize;
use crate::journal::UploadAudio;
use crate::storage::audio_content_type_for;
use actix_multipart::Multipart;
use actix_web::web;
use futures_util::stream::StreamExt;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

pub const AUDIO_FIELDS: &[&str] = &["audio", "audioFile"];
const MAX_TEXT_FIELD_BYTES: usize = 8 * 1024;

struct ReceivedFile {
    temp: NamedTempFile,
    size: usize,
    filename: Option<String>,
    content_type: String,
}

/// Resolve the content type to store, or `None` if this is not audio.
pub fn accepted_content_type(declared: Option<&str>, filename: Option<&str>) -> Option<String> {
    let declared = declared
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty());
    if let Some(ct) = &declared {
        if ct.starts_with("audio/") {
            return Some(ct.clone());
        }
    }
    filename
        .and_then(audio_content_type_for)
        .map(str::to_string)
}

async fn write_chunk(temp: NamedTempFile, data: web::Bytes) -> ApiResult<NamedTempFile> {
    let temp = web::block(move || {
        let mut temp = temp;
        temp.write_all(&data).map(|_| temp)
    })
    .await??;
    Ok(temp)
}

async fn read_text_field(field: &mut actix_multipart::Field, name: &str) -> ApiResult<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk?;
        if buf.len() + data.len() > MAX_TEXT_FIELD_BYTES {
            return Err(ApiError::bad_request(format!("Field \"{}\" is too long.", name)));
        }
        buf.extend_from_slice(&data);
    }
    String::from_utf8(buf)
        .map_err(|_| ApiError::bad_request(format!("Field \"{}\" must be UTF-8 text.", name)))
}

/// Drain the multipart body into an [`UploadAudio`].
pub async fn read_upload(mut payload: Multipart, max_bytes: usize) -> ApiResult<UploadAudio> {
    let mut file: Option<ReceivedFile> = None;
    let mut title: Option<String> = None;
    let mut tags: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .unwrap_or("")
            .to_string();

        if AUDIO_FIELDS.contains(&name.as_str()) {
            if file.is_some() {
                return Err(ApiError::bad_request("Only one audio file per upload."));
            }
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let declared = field.content_type().map(|m| m.essence_str().to_string());
            let content_type = accepted_content_type(declared.as_deref(), filename.as_deref())
                .ok_or_else(|| {
                    ApiError::UnsupportedMediaType("Only audio files are allowed.".into())
                })?;

            let mut temp = web::block(NamedTempFile::new).await??;
            let mut size = 0usize;
            while let Some(chunk) = field.next().await {
                let data = chunk?;
                size += data.len();
                if size > max_bytes {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "Audio file exceeds the {} byte limit.",
                        max_bytes
                    )));
                }
                temp = write_chunk(temp, data).await?;
            }
            debug!(size, content_type = %content_type, "audio part received");
            file = Some(ReceivedFile {
                temp,
                size,
                filename,
                content_type,
            });
        } else if name == "title" {
            title = Some(read_text_field(&mut field, "title").await?);
        } else if name == "tags" {
            tags = Some(read_text_field(&mut field, "tags").await?);
        } else {
            // Unknown parts are drained and ignored.
            while let Some(chunk) = field.next().await {
                chunk?;
            }
        }
    }

    let Some(file) = file else {
        return Err(ApiError::bad_request("No audio file uploaded."));
    };
    if file.size == 0 {
        return Err(ApiError::bad_request("Uploaded audio file is empty."));
    }

    let ReceivedFile {
        temp,
        filename,
        content_type,
        ..
    } = file;
    // The temp file is removed when the closure drops it.
    let bytes = web::block(move || std::fs::read(temp.path())).await??;

    Ok(UploadAudio {
        bytes,
        filename,
        content_type,
        title: sanitize::sanitize_title(title.as_deref()),
        tags: tags.as_deref().map(sanitize::parse_tags).unwrap_or_default(),
    })
}
