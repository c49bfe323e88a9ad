//! Sub-question decomposition.

use crate::message::{format_history, Message};
use crate::query::Query;
use sift_core::{AppError, AppResult};
use sift_llm::{LlmClient, LlmRequest};
use sift_prompt::{vars, PromptId, PromptLibrary};
use std::sync::Arc;

/// Literal response meaning "no decomposition needed".
pub const NO_SUBQUERIES: &str = "None";

/// Asks a model to split a query into independently answerable sub-questions.
#[derive(Clone)]
pub struct SubqueryPlanner {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    limit: Option<usize>,
}

impl SubqueryPlanner {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, model: impl Into<String>) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
            limit: None,
        }
    }

    /// Default cap on the number of sub-questions requested.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Generate sub-questions for `query`, in model output order.
    ///
    /// Returns an empty list only when the model answers `None`. A failed
    /// call or a blank response is an [`AppError::Generation`].
    pub async fn generate(
        &self,
        query: &Query,
        history: Option<&[Message]>,
        limit: Option<usize>,
    ) -> AppResult<Vec<String>> {
        let history = history.filter(|h| !h.is_empty());
        let limit = limit.or(self.limit);

        let prompt = self.prompts.render(
            PromptId::Subquery,
            &vars([
                ("query", query.text().to_string()),
                ("history", history.map(format_history).unwrap_or_default()),
                ("limit", limit.map(|l| l.to_string()).unwrap_or_default()),
            ]),
        )?;

        let response = self
            .client
            .complete(&LlmRequest::user(&self.model, prompt))
            .await
            .map_err(|e| AppError::Generation(format!("Subquery generation failed: {}", e)))?;

        let subqueries = parse_subqueries(&response.content)?;

        tracing::info!(
            model = %self.model,
            subqueries = subqueries.len(),
            "Generated subqueries"
        );
        Ok(subqueries)
    }
}

impl std::fmt::Debug for SubqueryPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubqueryPlanner")
            .field("model", &self.model)
            .field("limit", &self.limit)
            .finish()
    }
}

fn parse_subqueries(raw: &str) -> AppResult<Vec<String>> {
    let trimmed = raw.trim();

    if trimmed == NO_SUBQUERIES {
        return Ok(Vec::new());
    }
    if trimmed.is_empty() {
        return Err(AppError::Generation(
            "Subquery model returned an empty response".to_string(),
        ));
    }

    Ok(trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
