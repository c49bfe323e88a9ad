//! OpenAI-compatible provider (`/v1/chat/completions`, `/v1/embeddings`).
//!
//! Works against the hosted API and any server exposing the same routes.

use crate::client::{EmbeddingRequest, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};
use sift_core::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the hosted API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.openai.com", api_key)
    }

    /// Create a client for a custom base URL (without the `/v1` suffix).
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
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
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

fn into_llm_response(response: ChatCompletionResponse) -> AppResult<LlmResponse> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| {
            AppError::Llm(format!(
                "OpenAI returned no completion content for model {}",
                response.model
            ))
        })?;

    let usage = response
        .usage
        .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(LlmResponse {
        content,
        model: response.model,
        usage,
    })
}

fn into_ordered_embeddings(
    mut response: EmbeddingsResponse,
    expected: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(AppError::Llm(format!(
            "OpenAI returned {} embeddings for {} inputs",
            response.data.len(),
            expected
        )));
    }
    response.data.sort_by_key(|d| d.index);
    Ok(response.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, messages = request.messages.len(), "Sending chat completion to OpenAI");

        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response: ChatCompletionResponse = self
            .post("/v1/chat/completions", &body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        into_llm_response(response)
    }

    async fn embed(&self, request: &EmbeddingRequest) -> AppResult<Vec<Vec<f32>>> {
        tracing::debug!(model = %request.model, inputs = request.input.len(), "Sending embeddings request to OpenAI");

        let body = EmbeddingsRequest {
            model: &request.model,
            input: &request.input,
        };

        let response: EmbeddingsResponse = self
            .post("/v1/embeddings", &body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI embeddings: {}", e)))?;

        into_ordered_embeddings(response, request.input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_content_extracted() {
        let raw = r#"{
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Use same sources"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let response = into_llm_response(parsed).unwrap();

        assert_eq!(response.content, "Use same sources");
        assert_eq!(response.usage.total_tokens, 16);
    }

    #[test]
    fn test_missing_content_is_error() {
        let raw = r#"{"model": "gpt-4o", "choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(into_llm_response(parsed), Err(AppError::Llm(_))));
    }

    #[test]
    fn test_embeddings_reordered_by_index() {
        let raw = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        let embeddings = into_ordered_embeddings(parsed, 2).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_embedding_count_mismatch() {
        let raw = r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        assert!(into_ordered_embeddings(parsed, 3).is_err());
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = OpenAiClient::with_base_url("http://localhost:8000/", "key");
        assert_eq!(client.base_url, "http://localhost:8000");
        assert_eq!(client.provider_name(), "openai");
    }
}
