//! Merging of sub-answers into one reply.

use crate::emitter::SubqueryAnswer;
use crate::message::{format_history, Message};
use sift_core::{AppError, AppResult};
use sift_llm::{LlmClient, LlmRequest};
use sift_prompt::{vars, PromptId, PromptLibrary};
use std::sync::Arc;

/// Separator between pairs, and between sources in grounding prompts.
pub const SECTION_SEPARATOR: &str = "\n\n\n";

/// Combines `(subquery, answer)` pairs with one model call.
#[derive(Clone)]
pub struct ResponseMerger {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
}

impl ResponseMerger {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, model: impl Into<String>) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
        }
    }

    /// Merge `pairs` into one markdown answer to the first pair's subquery.
    pub async fn merge(&self, pairs: &[SubqueryAnswer], history: Option<&[Message]>) -> AppResult<String> {
        let Some(first) = pairs.first() else {
            return Err(AppError::Validation(
                "Cannot merge an empty set of subquery answers".to_string(),
            ));
        };

        let formatted = pairs
            .iter()
            .map(|p| format!("Subquery: {}\nResponse: {}", p.subquery.text(), p.answer))
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR);

        let prompt = self.prompts.render(
            PromptId::Merge,
            &vars([
                ("pairs", formatted),
                ("history", history.map(format_history).unwrap_or_default()),
                ("query", first.subquery.text().to_string()),
            ]),
        )?;

        tracing::debug!(model = %self.model, pairs = pairs.len(), "Merging subquery answers");

        let response = self
            .client
            .complete(&LlmRequest::user(&self.model, prompt))
            .await?;
        Ok(response.content)
    }
}

impl std::fmt::Debug for ResponseMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseMerger")
            .field("model", &self.model)
            .finish()
    }
}
