//! Prompt types for Sift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The prompts the pipeline sends, one per model-call stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Decompose a query into sub-questions
    Subquery,
    /// Rank retrieved candidates by relevance
    Rerank,
    /// Answer a query from a fixed set of sources
    Answer,
    /// Merge sub-answers into one answer
    Merge,
    /// Decide whether a follow-up needs new retrieval
    ContextRequest,
}

impl PromptId {
    pub const ALL: [PromptId; 5] = [
        PromptId::Subquery,
        PromptId::Rerank,
        PromptId::Answer,
        PromptId::Merge,
        PromptId::ContextRequest,
    ];

    /// File stem and registry name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subquery => "subquery",
            Self::Rerank => "rerank",
            Self::Answer => "answer",
            Self::Merge => "merge",
            Self::ContextRequest => "context_request",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prompt override loaded from `.sift/prompts/<id>.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Prompt identifier, matching a [`PromptId`]
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// Where the active template for a prompt came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOrigin {
    BuiltIn,
    Workspace(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_id_round_trip_names() {
        for id in PromptId::ALL {
            assert_eq!(PromptId::parse(id.as_str()), Some(id));
        }
        assert_eq!(PromptId::parse("summarize"), None);
        assert_eq!(PromptId::ContextRequest.to_string(), "context_request");
    }

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: merge
title: Terse merge
apiVersion: "1.0"
template: "{{pairs}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "merge");
        assert_eq!(def.created_by, "");
        assert_eq!(def.template, "{{pairs}}");
    }
}
