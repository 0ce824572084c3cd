//! Gemini REST API client
//!
//! Implements both provider capabilities against the generateContent
//! endpoint: JSON-mode text generation for the evaluator panel, and audio
//! transcription via inline audio parts.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LanguageModel, ProviderError, SpeechToText};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TRANSCRIPTION_PROMPT: &str = "Generate a transcript of the speech.";

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "empty provider API key".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Override the endpoint base URL (local proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::Parse(
                "response contained no text candidates".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate_json(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        };
        self.generate(&request).await
    }
}

#[async_trait]
impl SpeechToText for GeminiClient {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String, ProviderError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(TRANSCRIPTION_PROMPT),
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: encoded,
                        }),
                    },
                ],
            }],
            generation_config: None,
        };
        self.generate(&request).await
    }
}

// Request/response shapes for the generateContent endpoint

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(s: &str) -> Self {
        Self {
            text: Some(s.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(GeminiClient::new("", "gemini-2.5-flash").is_err());
        assert!(GeminiClient::new("  ", "gemini-2.5-flash").is_err());
        assert!(GeminiClient::new("key", "gemini-2.5-flash").is_ok());
    }

    #[test]
    fn response_parses_candidate_text() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"ok\":"}, {"text": "true}"}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .filter_map(|p| p.text.clone())
            .collect();
        assert_eq!(text, "{\"ok\":true}");
    }
}
