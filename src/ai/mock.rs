// src/ai/mock.rs
// Canned responses for local development without an API key.

use super::{AiError, ChatContext, ChatMessage, TherapistService, TranscriptionService};
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct MockAiProvider {
    pub transcription: String,
    pub response: String,
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self {
            transcription: "This is a mock transcription of the audio file.".to_string(),
            response: "This is a mock AI therapist response. It sounds like there is a lot on \
                       your mind; what stood out to you most today?"
                .to_string(),
        }
    }
}

#[async_trait]
impl TranscriptionService for MockAiProvider {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, AiError> {
        debug!(bytes = audio.len(), mime_type = %mime_type, "mock transcription");
        Ok(self.transcription.clone())
    }
}

#[async_trait]
impl TherapistService for MockAiProvider {
    async fn respond(&self, transcription: &str) -> Result<String, AiError> {
        debug!(chars = transcription.len(), "mock therapist response");
        Ok(self.response.clone())
    }

    async fn chat(
        &self,
        context: &ChatContext,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AiError> {
        debug!(title = %context.title, turns = history.len(), "mock therapist chat");
        Ok(format!("You said: \"{}\". {}", message.trim(), self.response))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
