/// LLM Client — the single point of entry for all generative-text calls.
///
/// ARCHITECTURAL RULE: No item orchestrator may call a completion API
/// directly. All LLM interactions MUST go through this module.
///
/// Two backends exist behind one trait: an OpenAI-compatible chat-completion
/// endpoint and a Gemini generateContent endpoint. Which one is used is a
/// configuration detail; orchestrators only ever see `complete()`.
///
/// There is deliberately no retry or backoff here. Item generation is a
/// one-shot, user-triggered operation with no meaningful partial output; a
/// failed upstream call fails the whole request. The only resilience measure
/// is a request timeout so a hung upstream cannot hang the request forever.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod json;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    /// The call succeeded but the completion does not have the shape the
    /// orchestrator needs (missing lines, missing markers, unparseable).
    #[error("Unusable completion: {0}")]
    Unusable(String),
}

/// Generation parameters sent with every completion request.
#[derive(Debug, Clone)]
pub struct GenParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// One completion backend. Implementations must return the raw completion
/// text; trimming happens in `LlmClient`.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        params: &GenParams,
    ) -> Result<String, LlmError>;
}

/// The single LLM client used by every orchestrator.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn CompletionBackend>,
    model: String,
}

impl LlmClient {
    pub fn openai(api_key: String, model: String) -> Self {
        Self::with_backend(Arc::new(OpenAiBackend::new(api_key)), model)
    }

    pub fn gemini(api_key: String, model: String) -> Self {
        Self::with_backend(Arc::new(GeminiBackend::new(api_key)), model)
    }

    /// Used by tests to inject a scripted backend.
    pub fn with_backend(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a rendered prompt and returns the trimmed completion.
    /// An empty completion is an error, never an empty string.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete_with(prompt, &GenParams::default()).await
    }

    pub async fn complete_with(
        &self,
        prompt: &str,
        params: &GenParams,
    ) -> Result<String, LlmError> {
        let raw = self.backend.complete(prompt, &self.model, params).await?;
        let text = raw.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        debug!("LLM call succeeded ({} chars)", text.len());
        Ok(text.to_string())
    }
}

fn build_http_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .expect("Failed to build HTTP client")
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible chat completion backend
// ────────────────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    client: Client,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: build_http_client(),
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        params: &GenParams,
    ) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Propagate the upstream message when the payload is parseable.
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini generateContent backend
// ────────────────────────────────────────────────────────────────────────────

pub struct GeminiBackend {
    client: Client,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: build_http_client(),
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    parts: Option<Vec<GeminiCandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        params: &GenParams,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{GEMINI_API_BASE}/{model}:generateContent?key={}",
            self.api_key
        );

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            },
        };

        let response = self.client.post(&url).json(&request_body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: GeminiResponse = response.json().await?;
        payload
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| p.drain(..).next())
            .and_then(|p| p.text)
            .ok_or(LlmError::EmptyContent)
    }
}
