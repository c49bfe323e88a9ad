//! LLM integration crate for Sift.
//!
//! Provider-agnostic access to chat completions and embeddings through the
//! [`LlmClient`] trait.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Hosted API or any compatible server
//!
//! # Example
//! ```no_run
//! use sift_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::user("llama3.1", "Hello, world!");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{EmbeddingRequest, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::{ChatMessage, ProviderType, Role};
