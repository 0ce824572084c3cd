//! External model providers
//!
//! The pipeline talks to two capabilities behind traits: text generation
//! with a JSON response contract, and speech-to-text. The shipped
//! implementation backs both with the Gemini REST API; tests substitute
//! scripted providers.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

/// Provider call errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Text generation with a JSON output contract.
///
/// Implementations return the model's raw text; callers strip fencing and
/// parse. A call is finite and not restartable: one prompt, one document.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate_json(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Speech-to-text over a complete audio blob
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, ProviderError>;
}

/// Placeholder provider used when no API key is configured.
///
/// Lets the service boot for local development; any grading run fails at
/// the first provider call with a clear message.
pub struct Unconfigured;

#[async_trait]
impl LanguageModel for Unconfigured {
    async fn generate_json(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(
            "set TRIBUNAL_API_KEY to enable grading".to_string(),
        ))
    }
}

#[async_trait]
impl SpeechToText for Unconfigured {
    async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, ProviderError> {
        Err(ProviderError::NotConfigured(
            "set TRIBUNAL_API_KEY to enable transcription".to_string(),
        ))
    }
}
