//! Test doubles for the pipeline: a scripted completion service and a
//! recording retriever.


use crate::node::{Node, ScoredNode};
use crate::retriever::Retriever;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sift_core::config::ModelsConfig;
use sift_core::{AppError, AppResult};
use sift_llm::{EmbeddingRequest, LlmClient, LlmRequest, LlmResponse};
use std::collections::HashSet;
use std::sync::Mutex;

pub(crate) const PLANNER: &str = "planner-model";
pub(crate) const RERANKER: &str = "rerank-model";
pub(crate) const ANSWERER: &str = "answer-model";
pub(crate) const MERGER: &str = "merge-model";
pub(crate) const CLASSIFIER: &str = "conversation-model";
pub(crate) const EMBEDDER: &str = "embed-model";

pub(crate) fn test_models() -> ModelsConfig {
    ModelsConfig {
        subquery: PLANNER.to_string(),
        reranker: RERANKER.to_string(),
        answer: ANSWERER.to_string(),
        merge: MERGER.to_string(),
        conversation: CLASSIFIER.to_string(),
        embedding: EMBEDDER.to_string(),
    }
}

struct Rule {
    model: String,
    needle: String,
    reply: Result<String, String>,
}

/// Completion service answering from a script.
///
/// A request is matched against rules in insertion order: the first rule
/// whose model equals the request model and whose needle occurs in the
/// prompt wins. Unmatched requests fail.
pub(crate) struct ScriptedClient {
    rules: Vec<Rule>,
    calls: Mutex<Vec<LlmRequest>>,
    embeddings: Mutex<Vec<EmbeddingRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
            embeddings: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on(mut self, model: &str, needle: &str, reply: &str) -> Self {
        self.rules.push(Rule {
            model: model.to_string(),
            needle: needle.to_string(),
            reply: Ok(reply.to_string()),
        });
        self
    }

    pub(crate) fn fail(mut self, model: &str, needle: &str, message: &str) -> Self {
        self.rules.push(Rule {
            model: model.to_string(),
            needle: needle.to_string(),
            reply: Err(message.to_string()),
        });
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Prompts sent to `model`, in call order.
    pub(crate) fn prompts_for(&self, model: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.model == model)
            .map(LlmRequest::prompt_text)
            .collect()
    }

    pub(crate) fn embedding_inputs(&self) -> Vec<Vec<String>> {
        self.embeddings
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.input.clone())
            .collect()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.lock().unwrap().push(request.clone());
        let prompt = request.prompt_text();

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.model == request.model && prompt.contains(&rule.needle));

        match rule {
            Some(Rule { reply: Ok(content), .. }) => Ok(LlmResponse::new(content, &request.model)),
            Some(Rule { reply: Err(message), .. }) => Err(AppError::Llm(message.clone())),
            None => Err(AppError::Llm(format!(
                "No scripted reply for model {} and prompt:\n{}",
                request.model, prompt
            ))),
        }
    }

    async fn embed(&self, request: &EmbeddingRequest) -> AppResult<Vec<Vec<f32>>> {
        self.embeddings.lock().unwrap().push(request.clone());
        Ok(request
            .input
            .iter()
            .map(|text| vec![text.len() as f32, 1.0])
            .collect())
    }
}

/// Retriever returning a fixed candidate list, filtered by document id,
/// and recording every call's filter.
pub(crate) struct RecordingRetriever {
    candidates: Vec<ScoredNode>,
    calls: Mutex<Vec<Option<HashSet<String>>>>,
}

impl RecordingRetriever {
    pub(crate) fn new(candidates: Vec<ScoredNode>) -> Self {
        Self {
            candidates,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn filters(&self) -> Vec<Option<HashSet<String>>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for RecordingRetriever {
    async fn top_k(
        &self,
        _embedding: &[f32],
        k: usize,
        doc_filter: Option<&HashSet<String>>,
    ) -> AppResult<Vec<ScoredNode>> {
        self.calls.lock().unwrap().push(doc_filter.cloned());

        Ok(self
            .candidates
            .iter()
            .filter(|c| match doc_filter {
                Some(filter) => filter.contains(c.node.document_key()),
                None => true,
            })
            .take(k)
            .cloned()
            .collect())
    }
}

/// A chunk belonging to document `doc`.
pub(crate) fn chunk(id: &str, doc: &str, title: &str, text: &str) -> Node {
    let metadata: Map<String, Value> = match json!({ "id": doc, "title": title }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    Node::new(text, metadata).with_id(id)
}

pub(crate) fn scored(node: Node, score: f32) -> ScoredNode {
    ScoredNode::new(node, score)
}
