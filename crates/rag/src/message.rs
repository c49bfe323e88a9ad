//! Conversation messages and per-subquery records.

use crate::source::{dedup_by_id, Source};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One sub-question of an answer cycle, with what answered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQueryRecord {
    pub subquery: String,

    /// Set when the record stands for the user's own query, undecomposed
    #[serde(default)]
    pub is_original_query: bool,

    #[serde(default)]
    pub ai_response: Option<String>,

    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

impl SubQueryRecord {
    pub fn new(subquery: impl Into<String>, is_original_query: bool) -> Self {
        Self {
            subquery: subquery.into(),
            is_original_query,
            ai_response: None,
            sources: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.ai_response = Some(response.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn sources(&self) -> &[Source] {
        self.sources.as_deref().unwrap_or_default()
    }
}

/// A turn in a conversation.
///
/// For AI messages the first record is the original query whenever no
/// decomposition happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: Option<String>,
    pub is_user: bool,
    #[serde(default)]
    pub subqueries: Vec<SubQueryRecord>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_user: true,
            subqueries: Vec::new(),
        }
    }

    pub fn ai(text: Option<String>, subqueries: Vec<SubQueryRecord>) -> Self {
        Self {
            text,
            is_user: false,
            subqueries,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// `User: ...` or `AI: ...`.
    pub fn to_content_str(&self) -> String {
        let speaker = if self.is_user { "User" } else { "AI" };
        format!("{}: {}", speaker, self.text())
    }

    /// Every source cited across this message's records, deduplicated by id.
    pub fn unique_sources(&self) -> Vec<Source> {
        dedup_by_id(self.subqueries.iter().flat_map(|sq| sq.sources()))
    }

    /// Ids of every document cited by this message.
    pub fn document_ids(&self) -> HashSet<String> {
        self.subqueries
            .iter()
            .flat_map(|sq| sq.sources())
            .map(|s| s.id.clone())
            .collect()
    }
}

/// Render history for a prompt, one message per line.
pub fn format_history(history: &[Message]) -> String {
    history
        .iter()
        .map(Message::to_content_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The most recent AI message in a history.
pub fn last_ai_message(history: &[Message]) -> Option<&Message> {
    history.iter().rev().find(|m| !m.is_user)
}
