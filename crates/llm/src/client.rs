//! LLM client abstraction and request/response types.
//!
//! The pipeline treats the language model as an opaque service: one
//! `complete(model, messages)` round trip per stage, plus batched embeddings.

use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};
use sift_core::AppResult;

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model identifier (e.g., "llama3.1", "gpt-4o")
    pub model: String,

    /// Ordered conversation sent to the model
    pub messages: Vec<ChatMessage>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a request from an explicit message list.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Create a request carrying a single user prompt.
    pub fn user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![ChatMessage::user(prompt)])
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Concatenated content of every message, for logging and test matching.
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    #[serde(default)]
    pub usage: LlmUsage,
}

impl LlmResponse {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: LlmUsage::default(),
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Batched embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Embedding model identifier
    pub model: String,

    /// Texts to embed; the response keeps this order
    pub input: Vec<String>,
}

impl EmbeddingRequest {
    pub fn new(model: impl Into<String>, input: Vec<String>) -> Self {
        Self {
            model: model.into(),
            input,
        }
    }
}

/// Trait for LLM providers.
///
/// Abstracts the underlying provider (Ollama, OpenAI, ...) behind one
/// completion call and one batched embedding call. Implementations do not retry.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "openai").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming chat completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// Embed every input text, returning one vector per input in order.
    async fn embed(&self, request: &EmbeddingRequest) -> AppResult<Vec<Vec<f32>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_request_builder() {
        let request = LlmRequest::user("llama3.1", "Hello")
            .with_temperature(0.2)
            .with_max_tokens(64);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0], ChatMessage::user("Hello"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(64));
    }

    #[test]
    fn test_prompt_text_joins_messages() {
        let request = LlmRequest::new(
            "m",
            vec![ChatMessage::system("be brief"), ChatMessage::user("why?")],
        );
        assert_eq!(request.prompt_text(), "be brief\nwhy?");
    }

    #[test]
    fn test_usage_totals() {
        let usage = LlmUsage::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
    }
}
