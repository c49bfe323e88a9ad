//! Model-judged reranking of retrieval candidates.

use crate::node::{Node, ScoredNode};
use crate::query::Query;
use serde::Deserialize;
use sift_core::{AppError, AppResult};
use sift_llm::{LlmClient, LlmRequest};
use sift_prompt::{vars, PromptId, PromptLibrary};
use std::collections::HashSet;
use std::sync::Arc;

/// One entry of the model's ranking.
#[derive(Debug, Deserialize)]
struct RankEntry {
    doc: i64,
    #[allow(dead_code)]
    relevance: f64,
}

/// Asks a model to reorder and filter candidates for one query.
#[derive(Clone)]
pub struct Reranker {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    top_n: Option<usize>,
}

impl Reranker {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, model: impl Into<String>) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
            top_n: None,
        }
    }

    /// Cap the number of nodes returned.
    pub fn with_top_n(mut self, top_n: Option<usize>) -> Self {
        self.top_n = top_n;
        self
    }

    /// Rank `candidates` for `query`, most relevant first.
    ///
    /// Irrelevant candidates are dropped by the model. An empty candidate
    /// list returns immediately without a model call.
    pub async fn rerank(&self, query: &Query, candidates: Vec<ScoredNode>) -> AppResult<Vec<Node>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let documents = candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| format!("Doc {} {}", i + 1, candidate.to_content_str()))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = self.prompts.render(
            PromptId::Rerank,
            &vars([
                ("documents", documents),
                ("query", query.text().to_string()),
            ]),
        )?;

        tracing::debug!(model = %self.model, candidates = candidates.len(), "Reranking");

        let response = self
            .client
            .complete(&LlmRequest::user(&self.model, prompt))
            .await?;

        let order = parse_ranking(&response.content, candidates.len())?;

        let mut slots: Vec<Option<Node>> = candidates.into_iter().map(|c| Some(c.node)).collect();
        let mut ranked: Vec<Node> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        if let Some(top_n) = self.top_n {
            ranked.truncate(top_n);
        }

        tracing::debug!(kept = ranked.len(), "Reranked candidates");
        Ok(ranked)
    }
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field("model", &self.model)
            .field("top_n", &self.top_n)
            .finish()
    }
}

/// Parse `[{"doc": n, "relevance": r}, ...]` into zero-based indices.
///
/// Every index must lie in `1..=count`. Repeats keep their first position.
fn parse_ranking(raw: &str, count: usize) -> AppResult<Vec<usize>> {
    let entries: Vec<RankEntry> = serde_json::from_str(raw.trim()).map_err(|e| {
        AppError::RerankParse(format!("Reranker did not return a JSON ranking: {}", e))
    })?;

    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.doc < 1 || entry.doc as usize > count {
            return Err(AppError::RerankParse(format!(
                "Document index {} outside 1..={}",
                entry.doc, count
            )));
        }
        let index = entry.doc as usize - 1;
        if seen.insert(index) {
            order.push(index);
        }
    }

    Ok(order)
}
