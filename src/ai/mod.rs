// src/ai/mod.rs
// Generative AI seams: transcription and the reflective "therapist" model.
// Default: Gemini over REST; canned mock when no API key is configured.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiClient;
pub use mock::MockAiProvider;

use crate::config::ApiConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const TRANSCRIPTION_PROMPT: &str =
    "Transcribe this audio journal entry verbatim. Return only the spoken words as plain text, \
     without timestamps, speaker labels or commentary.";

pub const THERAPIST_SYSTEM_PROMPT: &str =
    "You are a warm, thoughtful therapist responding to a personal audio journal entry. \
     Reflect back the feelings and themes you notice, offer one or two gentle questions or \
     perspectives, and keep the reply under 200 words. Do not diagnose.";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service connection failed: {0}")]
    ConnectionFailed(String),

    #[error("AI request timed out")]
    Timeout,

    #[error("AI provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("AI response blocked: {0}")]
    Blocked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "assistant")]
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// What the therapist knows about the entry a chat is about.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub title: String,
    pub transcription: String,
    pub ai_response: String,
}

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, AiError>;
}

#[async_trait]
pub trait TherapistService: Send + Sync {
    /// First reflective response to a freshly transcribed entry.
    async fn respond(&self, transcription: &str) -> Result<String, AiError>;

    /// Follow-up conversation about an entry.
    async fn chat(
        &self,
        context: &ChatContext,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AiError>;

    fn model_name(&self) -> &str;
}

pub struct AiServices {
    pub transcription: Arc<dyn TranscriptionService>,
    pub therapist: Arc<dyn TherapistService>,
}

/// Pick the Gemini client when an API key is configured, otherwise the mock.
pub fn build_ai_services(config: &ApiConfig) -> Result<AiServices, AiError> {
    match &config.gemini_api_key {
        Some(key) => {
            info!(
                transcription_model = %config.transcription_model,
                therapist_model = %config.therapist_model,
                "Initializing Gemini AI services"
            );
            let client = Arc::new(GeminiClient::new(
                key.clone(),
                config.gemini_base_url.clone(),
                config.transcription_model.clone(),
                config.therapist_model.clone(),
                config.ai_timeout,
            )?);
            Ok(AiServices {
                transcription: client.clone(),
                therapist: client,
            })
        }
        None => {
            warn!("GEMINI_API_KEY not set; using mock AI responses");
            let mock = Arc::new(MockAiProvider::default());
            Ok(AiServices {
                transcription: mock.clone(),
                therapist: mock,
            })
        }
    }
}

/// Prompt sent to the therapist for a new entry.
pub fn entry_prompt(transcription: &str) -> String {
    format!(
        "Here is my journal entry for today:\n\n\"{}\"\n\nPlease respond to it.",
        transcription.trim()
    )
}

/// System instruction for a chat about a specific entry.
pub fn chat_system_prompt(context: &ChatContext) -> String {
    format!(
        "{}\n\nThe user is following up on their journal entry titled \"{}\".\n\
         Entry transcription:\n{}\n\nYour earlier response:\n{}",
        THERAPIST_SYSTEM_PROMPT, context.title, context.transcription, context.ai_response
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_roles_deserialize() {
        let msgs: Vec<ChatMessage> = serde_json::from_str(
            r#"[{"role":"user","text":"Hi"},{"role":"model","text":"Hello"},{"role":"assistant","text":"Hey"}]"#,
        )
        .unwrap();
        assert_eq!(msgs[0].role, ChatRole::User);
        assert_eq!(msgs[1].role, ChatRole::Model);
        assert_eq!(msgs[2].role, ChatRole::Model);
    }

    #[test]
    fn test_chat_system_prompt_includes_entry() {
        let ctx = ChatContext {
            title: "Rainy Tuesday".into(),
            transcription: "I felt tired all day".into(),
            ai_response: "It sounds like a heavy day".into(),
        };
        let prompt = chat_system_prompt(&ctx);
        assert!(prompt.contains("Rainy Tuesday"));
        assert!(prompt.contains("I felt tired all day"));
        assert!(prompt.contains("It sounds like a heavy day"));
    }

    #[test]
    fn test_ai_error_display() {
        let err = AiError::Provider {
            status: 429,
            body: "quota".into(),
        };
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_mock_selected_without_key() {
        let config = ApiConfig::default();
        let services = build_ai_services(&config).unwrap();
        assert_eq!(services.therapist.model_name(), "mock");
    }
}
