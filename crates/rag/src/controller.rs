//! Per-message decision on whether a follow-up needs new retrieval.

use crate::answer::{AnswerEngine, DecompositionOptions, Reply};
use crate::emitter::{ProgressEmitter, ProgressEvent};
use crate::message::{last_ai_message, Message};
use crate::query::ensure_text;
use sift_core::{AppError, AppResult};
use sift_llm::{LlmClient, LlmRequest};
use sift_prompt::{vars, PromptId, PromptLibrary};
use std::collections::HashSet;
use std::sync::Arc;

pub const START_NEW_QUERY: &str = "Start new query";
pub const SEARCH_DOCUMENTS: &str = "Search documents";
pub const USE_SAME_SOURCES: &str = "Use same sources";

/// Separator between previous queries and between cited sources.
const CONTEXT_SEPARATOR: &str = "\n==\n";

/// The classifier's answer, matched against a closed label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    StartNewQuery,
    SearchDocuments,
    UseSameSources,
    Unrecognized(String),
}

impl Classification {
    /// Match a raw label after trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            START_NEW_QUERY => Self::StartNewQuery,
            SEARCH_DOCUMENTS => Self::SearchDocuments,
            USE_SAME_SOURCES => Self::UseSameSources,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }
}

/// Where the sources for a reply come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalStrategy {
    /// First message of a conversation
    FreshAnswer,
    /// Follow-up needing entirely new sources
    StartNewQuery,
    /// Follow-up answerable from these documents, with new chunks
    SearchDocuments(HashSet<String>),
    /// Follow-up answerable from the previous sources as they are
    UseSameSources,
}

impl RetrievalStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FreshAnswer => "fresh_answer",
            Self::StartNewQuery => "start_new_query",
            Self::SearchDocuments(_) => "search_documents",
            Self::UseSameSources => "use_same_sources",
        }
    }

    fn into_options(self) -> DecompositionOptions {
        match self {
            Self::FreshAnswer | Self::StartNewQuery => DecompositionOptions::decompose(),
            Self::SearchDocuments(documents) => DecompositionOptions::decompose_within(documents),
            Self::UseSameSources => DecompositionOptions::reuse_last_sources(),
        }
    }
}

/// Entry point for answering one user message in a conversation.
///
/// Holds no conversation state; continuity comes from the caller's history.
pub struct ConversationController {
    engine: Arc<AnswerEngine>,
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
}

impl ConversationController {
    pub fn new(
        engine: Arc<AnswerEngine>,
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            client,
            prompts,
            model: model.into(),
        }
    }

    /// Produce the reply to `message` given the conversation so far.
    pub async fn generate_response(
        &self,
        message: &Message,
        history: &[Message],
        emitter: &ProgressEmitter,
    ) -> AppResult<Reply> {
        let text = message.text();
        ensure_text(text)?;

        let strategy = self.decide(text, history, emitter).await?;
        tracing::info!(strategy = strategy.name(), history = history.len(), "Chose retrieval strategy");

        let history = match strategy {
            RetrievalStrategy::FreshAnswer => None,
            _ => Some(history),
        };

        let query = self.engine.embedder().embed_query(text).await?;

        self.engine
            .answer_with_decomposition(&query, strategy.into_options(), history, emitter)
            .await
    }

    /// Pick a strategy, classifying follow-ups with one model call.
    pub async fn decide(
        &self,
        text: &str,
        history: &[Message],
        emitter: &ProgressEmitter,
    ) -> AppResult<RetrievalStrategy> {
        if history.is_empty() {
            return Ok(RetrievalStrategy::FreshAnswer);
        }

        let Some(last) = last_ai_message(history) else {
            tracing::debug!("History has no AI message; nothing to reuse");
            return Ok(RetrievalStrategy::StartNewQuery);
        };

        let previous_queries = last
            .subqueries
            .iter()
            .map(|sq| sq.subquery.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let sources = last
            .subqueries
            .iter()
            .flat_map(|sq| sq.sources())
            .map(|s| s.to_content_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let prompt = self.prompts.render(
            PromptId::ContextRequest,
            &vars([
                ("new_query", text.to_string()),
                ("previous_queries", previous_queries),
                ("sources", sources),
            ]),
        )?;

        let response = self
            .client
            .complete(&LlmRequest::user(&self.model, prompt))
            .await?;
        let label = response.content;

        tracing::debug!(model = %self.model, label = %label, "Context decision");
        emitter.emit(ProgressEvent::ContextDecision(label.clone()));

        match Classification::parse(&label) {
            Classification::StartNewQuery => Ok(RetrievalStrategy::StartNewQuery),
            Classification::SearchDocuments => {
                Ok(RetrievalStrategy::SearchDocuments(last.document_ids()))
            }
            Classification::UseSameSources => Ok(RetrievalStrategy::UseSameSources),
            Classification::Unrecognized(raw) => Err(AppError::UnexpectedModelOutput(format!(
                "Context decision {:?} is not one of {:?}, {:?}, {:?}",
                raw, START_NEW_QUERY, SEARCH_DOCUMENTS, USE_SAME_SOURCES
            ))),
        }
    }
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("model", &self.model)
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_exactly_after_trim() {
        assert_eq!(Classification::parse("Start new query"), Classification::StartNewQuery);
        assert_eq!(Classification::parse(" Search documents\n"), Classification::SearchDocuments);
        assert_eq!(Classification::parse("Use same sources"), Classification::UseSameSources);
    }

    #[test]
    fn test_near_miss_labels_unrecognized() {
        for raw in ["use same sources", "\"Use same sources\"", "C", "Maybe", ""] {
            assert_eq!(
                Classification::parse(raw),
                Classification::Unrecognized(raw.to_string())
            );
        }
    }

    #[test]
    fn test_strategy_options() {
        assert!(RetrievalStrategy::FreshAnswer.into_options().use_subqueries);

        let docs: HashSet<String> = ["d1".to_string()].into_iter().collect();
        let options = RetrievalStrategy::SearchDocuments(docs.clone()).into_options();
        assert!(options.use_subqueries);
        assert_eq!(options.doc_filter, Some(docs));

        let options = RetrievalStrategy::UseSameSources.into_options();
        assert!(!options.use_subqueries);
        assert!(options.use_last_message_sources);
    }
}
