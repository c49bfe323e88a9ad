//! Retrieved chunks and their prompt formatting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata keys that are bookkeeping, never shown to the model.
pub const EXCLUDED_METADATA_KEYS: [&str; 11] = [
    "_node_content",
    "hash",
    "start_char_idx",
    "end_char_idx",
    "text_template",
    "metadata_template",
    "metadata_separator",
    "ref_doc_id",
    "document_id",
    "doc_id",
    "_node_type",
];

/// Metadata field holding the owning document's id.
pub const DOCUMENT_ID_KEY: &str = "id";

/// A chunk of document text with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Chunk identifier; generated when absent
    #[serde(default = "new_node_id")]
    pub id: String,

    pub text: String,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Vector embedding, filled in before indexing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

fn new_node_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Node {
    /// Create a node with a fresh id.
    pub fn new(text: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            id: new_node_id(),
            text: text.into(),
            metadata,
            embedding: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Id of the document this chunk belongs to.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata_str(DOCUMENT_ID_KEY)
    }

    /// Key that groups this chunk into a document: the document id, or the
    /// node's own id when it has none. Sources and retrieval filters agree on it.
    pub fn document_key(&self) -> &str {
        self.document_id().unwrap_or(&self.id)
    }

    /// String-valued metadata field.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Content as shown to the model: visible metadata as `key: value`
    /// lines, a blank line, then the text.
    pub fn to_content_str(&self) -> String {
        let hidden = self.hidden_keys();

        let metadata_lines: Vec<String> = self
            .metadata
            .iter()
            .filter(|(key, _)| {
                !EXCLUDED_METADATA_KEYS.contains(&key.as_str()) && !hidden.contains(key)
            })
            .map(|(key, value)| format!("{}: {}", key, display_value(value)))
            .collect();

        if metadata_lines.is_empty() {
            return self.text.clone();
        }

        format!("{}\n\n{}", metadata_lines.join("\n"), self.text)
    }

    /// Keys listed under `excluded_llm_metadata_keys` in `_node_content`.
    fn hidden_keys(&self) -> Vec<String> {
        let Some(raw) = self.metadata_str("_node_content") else {
            return Vec::new();
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(content) => content
                .get("excluded_llm_metadata_keys")
                .and_then(Value::as_array)
                .map(|keys| {
                    keys.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => {
                tracing::debug!(node = %self.id, error = %e, "Ignoring unparsable _node_content");
                Vec::new()
            }
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A retrieval candidate with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f32,
}

impl ScoredNode {
    pub fn new(node: Node, score: f32) -> Self {
        Self { node, score }
    }

    pub fn to_content_str(&self) -> String {
        self.node.to_content_str()
    }
}
