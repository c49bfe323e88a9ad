//! Documents cited by an answer.

use crate::node::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Separator between chunks inside one source.
pub const CHUNK_SEPARATOR: &str = "\n--\n";

/// One document's contribution to an answer.
///
/// Identity is the document `id`; `chunks` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub last_author_name: String,
    #[serde(default)]
    pub last_author_picture_url: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub chunks: Vec<String>,
}

impl Source {
    pub fn to_content_str(&self) -> String {
        format!(
            "Title: {}\nChunks: {}\n",
            self.title,
            self.chunks.join(CHUNK_SEPARATOR)
        )
    }

    /// Group nodes into sources by document, in order of first appearance.
    ///
    /// Nodes without a document id form a source of their own, keyed by node id.
    pub fn from_nodes(nodes: &[Node]) -> Vec<Source> {
        let mut sources: Vec<Source> = Vec::new();

        for node in nodes {
            if node.text.is_empty() {
                continue;
            }
            let id = node.document_key();

            match sources.iter_mut().find(|s| s.id == id) {
                Some(source) => source.chunks.push(node.text.clone()),
                None => sources.push(Source {
                    id: id.to_string(),
                    file_type: field(node, "file_type"),
                    last_author_name: field(node, "last_author_name"),
                    last_author_picture_url: field(node, "last_author_picture_url"),
                    last_modified: field(node, "last_modified"),
                    title: field(node, "title"),
                    url: field(node, "url"),
                    chunks: vec![node.text.clone()],
                }),
            }
        }

        sources
    }
}

fn field(node: &Node, key: &str) -> String {
    match node.metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Keep the first occurrence of each source id.
pub fn dedup_by_id<'a>(sources: impl IntoIterator<Item = &'a Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .cloned()
        .collect()
}
