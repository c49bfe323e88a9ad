//! Grounded answering, with optional decomposition into sub-questions.

use crate::emitter::{ProgressEmitter, ProgressEvent, SubqueryAnswer};
use crate::embeddings::Embedder;
use crate::merger::{ResponseMerger, SECTION_SEPARATOR};
use crate::message::{format_history, last_ai_message, Message, SubQueryRecord};
use crate::node::Node;
use crate::planner::SubqueryPlanner;
use crate::query::Query;
use crate::reranker::Reranker;
use crate::retriever::Retriever;
use crate::source::Source;
use futures::future::join_all;
use sift_core::config::{ModelsConfig, RetrievalConfig};
use sift_core::{AppError, AppResult};
use sift_llm::{LlmClient, LlmRequest};
use sift_prompt::{vars, PromptId, PromptLibrary};
use std::collections::HashSet;
use std::sync::Arc;

/// Candidates retrieved per query before reranking.
pub const DEFAULT_TOP_K: usize = 5;

/// How `answer_with_decomposition` finds its sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecompositionOptions {
    /// Split the query into sub-questions and answer each separately
    pub use_subqueries: bool,
    /// Restrict retrieval to these document ids
    pub doc_filter: Option<HashSet<String>>,
    /// Answer from the previous AI message's sources, without retrieval
    pub use_last_message_sources: bool,
}

impl DecompositionOptions {
    /// Decompose and retrieve from the whole corpus.
    pub fn decompose() -> Self {
        Self {
            use_subqueries: true,
            ..Self::default()
        }
    }

    /// Decompose and retrieve only within `documents`.
    pub fn decompose_within(documents: HashSet<String>) -> Self {
        Self {
            use_subqueries: true,
            doc_filter: Some(documents),
            use_last_message_sources: false,
        }
    }

    /// Answer directly from the previous AI message's sources.
    pub fn reuse_last_sources() -> Self {
        Self {
            use_last_message_sources: true,
            ..Self::default()
        }
    }
}

/// Final answer of one cycle plus the records that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub answer: String,
    pub subqueries: Vec<SubQueryRecord>,
}

impl Reply {
    /// The AI message to append to the conversation.
    pub fn into_message(self) -> Message {
        Message::ai(Some(self.answer), self.subqueries)
    }
}

/// Result of one sub-question task.
struct SubqueryOutcome {
    pair: SubqueryAnswer,
    sources: Vec<Source>,
}

/// Answers queries grounded in retrieved or supplied sources.
pub struct AnswerEngine {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    retriever: Arc<dyn Retriever>,
    embedder: Embedder,
    reranker: Reranker,
    planner: SubqueryPlanner,
    merger: ResponseMerger,
    top_k: usize,
}

impl AnswerEngine {
    /// Wire every stage to `client`, using the per-stage model names.
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        retriever: Arc<dyn Retriever>,
        models: &ModelsConfig,
    ) -> Self {
        Self {
            model: models.answer.clone(),
            retriever,
            embedder: Embedder::new(Arc::clone(&client), &models.embedding),
            reranker: Reranker::new(Arc::clone(&client), Arc::clone(&prompts), &models.reranker),
            planner: SubqueryPlanner::new(Arc::clone(&client), Arc::clone(&prompts), &models.subquery),
            merger: ResponseMerger::new(Arc::clone(&client), Arc::clone(&prompts), &models.merge),
            top_k: DEFAULT_TOP_K,
            client,
            prompts,
        }
    }

    /// Apply retrieval knobs: candidate count, rerank cap, sub-question cap.
    pub fn with_retrieval(mut self, retrieval: &RetrievalConfig) -> Self {
        self.top_k = retrieval.top_k;
        self.reranker = self.reranker.with_top_n(retrieval.rerank_top_n);
        self.planner = self.planner.with_limit(retrieval.subquery_limit);
        self
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Answer `query` from `sources`, or from freshly retrieved and reranked
    /// candidates when `sources` is `None`.
    pub async fn answer(
        &self,
        query: &Query,
        sources: Option<&[Node]>,
        history: Option<&[Message]>,
    ) -> AppResult<String> {
        let contexts = match sources {
            Some(nodes) => node_contents(nodes),
            None => node_contents(&self.retrieve_and_rerank(query, None).await?),
        };
        self.ground(query, contexts, history).await
    }

    /// Answer `query` using the strategy in `options`.
    ///
    /// With sub-questions, every sub-question is retrieved, reranked and
    /// answered concurrently; all tasks finish before the first failure (in
    /// sub-question order) is returned. Progress is emitted once with the
    /// sub-questions and once with the answered pairs, then the pairs are merged.
    pub async fn answer_with_decomposition(
        &self,
        query: &Query,
        options: DecompositionOptions,
        history: Option<&[Message]>,
        emitter: &ProgressEmitter,
    ) -> AppResult<Reply> {
        if options.use_subqueries && options.use_last_message_sources {
            return Err(AppError::Validation(
                "Cannot combine subqueries with last message sources".to_string(),
            ));
        }
        if options.use_last_message_sources && options.doc_filter.is_some() {
            return Err(AppError::Validation(
                "Cannot combine a document filter with last message sources".to_string(),
            ));
        }

        let history = history.filter(|h| !h.is_empty());

        if !options.use_subqueries {
            return self.answer_direct(query, &options, history).await;
        }

        let planned = self.planner.generate(query, history, None).await?;
        let texts: Vec<String> = planned.into_iter().filter(|s| !s.is_empty()).collect();

        let (subqueries, is_original_query) = if texts.is_empty() {
            tracing::debug!("No decomposition needed; answering the query itself");
            (vec![query.clone()], true)
        } else {
            (self.embedder.embed_queries(&texts).await?, false)
        };

        emitter.emit(ProgressEvent::Subqueries(subqueries.clone()));

        let doc_filter = options.doc_filter.as_ref();
        let outcomes = join_all(
            subqueries
                .iter()
                .map(|subquery| self.answer_subquery(subquery, doc_filter)),
        )
        .await;

        let failures = outcomes.iter().filter(|o| o.is_err()).count();
        if failures > 0 {
            tracing::warn!(failures, total = outcomes.len(), "Subquery tasks failed");
        }
        let outcomes: Vec<SubqueryOutcome> = outcomes.into_iter().collect::<AppResult<_>>()?;

        let pairs: Vec<SubqueryAnswer> = outcomes.iter().map(|o| o.pair.clone()).collect();
        emitter.emit(ProgressEvent::Answers(pairs.clone()));

        let answer = self.merger.merge(&pairs, history).await?;

        let records = outcomes
            .into_iter()
            .map(|o| {
                SubQueryRecord::new(o.pair.subquery.text(), is_original_query)
                    .with_response(o.pair.answer)
                    .with_sources(o.sources)
            })
            .collect();

        Ok(Reply {
            answer,
            subqueries: records,
        })
    }

    /// Single grounding call over either the last message's sources or
    /// fresh retrieval, honouring `doc_filter` when retrieving.
    async fn answer_direct(
        &self,
        query: &Query,
        options: &DecompositionOptions,
        history: Option<&[Message]>,
    ) -> AppResult<Reply> {
        let (contexts, sources) = if options.use_last_message_sources {
            let last = history.and_then(last_ai_message).ok_or_else(|| {
                AppError::Validation(
                    "Reusing sources requires a previous AI message in history".to_string(),
                )
            })?;
            let sources = last.unique_sources();
            let contexts = sources.iter().map(Source::to_content_str).collect();
            (contexts, sources)
        } else {
            let nodes = self
                .retrieve_and_rerank(query, options.doc_filter.as_ref())
                .await?;
            (node_contents(&nodes), Source::from_nodes(&nodes))
        };

        let answer = self.ground(query, contexts, history).await?;

        let record = SubQueryRecord::new(query.text(), true)
            .with_response(answer.clone())
            .with_sources(sources);

        Ok(Reply {
            answer,
            subqueries: vec![record],
        })
    }

    async fn answer_subquery(
        &self,
        subquery: &Query,
        doc_filter: Option<&HashSet<String>>,
    ) -> AppResult<SubqueryOutcome> {
        let nodes = self.retrieve_and_rerank(subquery, doc_filter).await?;

        let answer = if nodes.is_empty() {
            tracing::debug!(subquery = %subquery, "No supporting documents");
            String::new()
        } else {
            self.ground(subquery, node_contents(&nodes), None).await?
        };

        Ok(SubqueryOutcome {
            pair: SubqueryAnswer {
                subquery: subquery.clone(),
                answer,
            },
            sources: Source::from_nodes(&nodes),
        })
    }

    async fn retrieve_and_rerank(
        &self,
        query: &Query,
        doc_filter: Option<&HashSet<String>>,
    ) -> AppResult<Vec<Node>> {
        let candidates = self
            .retriever
            .top_k(query.embedding(), self.top_k, doc_filter)
            .await
            .map_err(|e| match e {
                AppError::Retrieval(_) => e,
                other => AppError::Retrieval(other.to_string()),
            })?;

        self.reranker.rerank(query, candidates).await
    }

    /// One completion over already formatted contexts, returned verbatim.
    async fn ground(
        &self,
        query: &Query,
        contexts: Vec<String>,
        history: Option<&[Message]>,
    ) -> AppResult<String> {
        let count = contexts.len();
        let sources_str = contexts.join(SECTION_SEPARATOR);

        let prompt = self.prompts.render(
            PromptId::Answer,
            &vars([
                ("sources", sources_str),
                ("history", history.map(format_history).unwrap_or_default()),
                ("query", query.text().to_string()),
            ]),
        )?;

        tracing::debug!(model = %self.model, sources = count, "Answering");

        let response = self
            .client
            .complete(&LlmRequest::user(&self.model, prompt))
            .await?;
        Ok(response.content)
    }
}

fn node_contents(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(Node::to_content_str).collect()
}

impl std::fmt::Debug for AnswerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerEngine")
            .field("model", &self.model)
            .field("top_k", &self.top_k)
            .field("reranker", &self.reranker)
            .field("planner", &self.planner)
            .finish()
    }
}
