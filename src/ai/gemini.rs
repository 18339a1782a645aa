// src/ai/gemini.rs
//! Gemini (Google Generative Language API) client.
//!
//! One `generateContent` call per operation: inline base64 audio for
//! transcription, a text prompt for the first reflection, and the chat
//! history as `contents[]` for follow-ups. No automatic retries.

use super::{
    chat_system_prompt, entry_prompt, AiError, ChatContext, ChatMessage, ChatRole,
    TherapistService, TranscriptionService, THERAPIST_SYSTEM_PROMPT, TRANSCRIPTION_PROMPT,
};
use crate::monitoring::metrics;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    transcription_model: String,
    therapist_model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: String,
        transcription_model: String,
        therapist_model: String,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            transcription_model,
            therapist_model,
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    async fn generate(&self, kind: &str, model: &str, payload: Value) -> Result<String, AiError> {
        let started = Instant::now();
        let result = self.send(model, payload).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::observe_ai_duration_ms(kind, elapsed_ms);
        match &result {
            Ok(text) => info!(kind, model, chars = text.len(), elapsed_ms, "Gemini generation complete"),
            Err(e) => warn!(kind, model, error = %e, elapsed_ms, "Gemini generation failed"),
        }
        result
    }

    async fn send(&self, model: &str, payload: Value) -> Result<String, AiError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::ConnectionFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Provider { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;
        extract_text(&body)
    }
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(body: &Value) -> Result<String, AiError> {
    if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
        return Err(AiError::Blocked(reason.to_string()));
    }
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| AiError::InvalidResponse("no candidate content".to_string()))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    if text.is_empty() {
        return Err(AiError::InvalidResponse("empty candidate text".to_string()));
    }
    Ok(text.to_string())
}

fn history_contents(history: &[ChatMessage], message: &str) -> Vec<Value> {
    let mut contents: Vec<Value> = history
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| {
            let role = match m.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            json!({ "role": role, "parts": [{ "text": m.text }] })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));
    contents
}

#[async_trait]
impl TranscriptionService for GeminiClient {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, AiError> {
        debug!(bytes = audio.len(), mime_type = %mime_type, "Transcribing with Gemini");
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": TRANSCRIPTION_PROMPT },
                    { "inline_data": { "mime_type": mime_type, "data": STANDARD.encode(audio) } }
                ]
            }]
        });
        self.generate("transcription", &self.transcription_model, payload)
            .await
    }
}

#[async_trait]
impl TherapistService for GeminiClient {
    async fn respond(&self, transcription: &str) -> Result<String, AiError> {
        let payload = json!({
            "system_instruction": { "parts": [{ "text": THERAPIST_SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": entry_prompt(transcription) }] }]
        });
        self.generate("therapist", &self.therapist_model, payload).await
    }

    async fn chat(
        &self,
        context: &ChatContext,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AiError> {
        let payload = json!({
            "system_instruction": { "parts": [{ "text": chat_system_prompt(context) }] },
            "contents": history_contents(history, message)
        });
        self.generate("chat", &self.therapist_model, payload).await
    }

    fn model_name(&self) -> &str {
        &self.therapist_model
    }
}
