//! Embedding of queries and nodes through the completion service.

use crate::node::Node;
use crate::query::{ensure_text, Query};
use sift_core::{AppError, AppResult};
use sift_llm::{EmbeddingRequest, LlmClient};
use std::sync::Arc;

/// Maximum texts sent in one embedding request.
pub const EMBEDDING_BATCH_SIZE: usize = 100;

/// Turns text into [`Query`] values with one batched embedding call.
#[derive(Clone)]
pub struct Embedder {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl Embedder {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a single query.
    pub async fn embed_query(&self, text: &str) -> AppResult<Query> {
        let mut queries = self.embed_queries(&[text.to_string()]).await?;
        queries
            .pop()
            .ok_or_else(|| AppError::Llm("Embedding response was empty".to_string()))
    }

    /// Embed several queries in order. Every text is validated before any call.
    pub async fn embed_queries(&self, texts: &[String]) -> AppResult<Vec<Query>> {
        for text in texts {
            ensure_text(text)?;
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embed_texts(texts.to_vec()).await?;

        texts
            .iter()
            .zip(vectors)
            .map(|(text, vector)| Query::new(text.clone(), vector))
            .collect()
    }

    /// Fill in embeddings for nodes that have none, in batches.
    pub async fn embed_nodes(&self, nodes: &mut [Node]) -> AppResult<usize> {
        let missing: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        for batch in missing.chunks(EMBEDDING_BATCH_SIZE) {
            let texts = batch.iter().map(|&i| nodes[i].text.clone()).collect();
            let vectors = self.embed_texts(texts).await?;
            for (&i, vector) in batch.iter().zip(vectors) {
                nodes[i].embedding = Some(vector);
            }
        }

        tracing::debug!(embedded = missing.len(), total = nodes.len(), "Embedded nodes");
        Ok(missing.len())
    }

    async fn embed_texts(&self, input: Vec<String>) -> AppResult<Vec<Vec<f32>>> {
        let expected = input.len();
        let request = EmbeddingRequest::new(&self.model, input);
        let vectors = self.client.embed(&request).await?;

        if vectors.len() != expected {
            return Err(AppError::Llm(format!(
                "Embedding count mismatch: expected {}, got {}",
                expected,
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .finish()
    }
}
