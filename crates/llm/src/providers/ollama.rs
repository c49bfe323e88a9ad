//! Ollama LLM provider implementation.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{EmbeddingRequest, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};
use sift_core::{AppError, AppResult};

/// Ollama `/api/chat` request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize, PartialEq)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama `/api/chat` response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:11434")
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn options(request: &LlmRequest) -> Option<OllamaOptions> {
        if request.temperature.is_none() && request.max_tokens.is_none() {
            return None;
        }
        Some(OllamaOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, messages = request.messages.len(), "Sending chat request to Ollama");

        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            options: Self::options(request),
        };

        let response: OllamaChatResponse = self
            .post("/api/chat", &body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        if response.message.content.is_empty() {
            return Err(AppError::Llm(format!(
                "Ollama returned an empty completion for model {}",
                response.model
            )));
        }

        Ok(LlmResponse {
            content: response.message.content,
            model: response.model,
            usage: LlmUsage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
        })
    }

    async fn embed(&self, request: &EmbeddingRequest) -> AppResult<Vec<Vec<f32>>> {
        tracing::debug!(model = %request.model, inputs = request.input.len(), "Sending embed request to Ollama");

        let body = OllamaEmbedRequest {
            model: &request.model,
            input: &request.input,
        };

        let response: OllamaEmbedResponse = self
            .post("/api/embed", &body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama embeddings: {}", e)))?;

        if response.embeddings.len() != request.input.len() {
            return Err(AppError::Llm(format!(
                "Ollama returned {} embeddings for {} inputs",
                response.embeddings.len(),
                request.input.len()
            )));
        }

        Ok(response.embeddings)
    }
}
