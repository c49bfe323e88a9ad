//! Nearest-neighbour retrieval boundary.

use crate::node::{Node, ScoredNode};
use async_trait::async_trait;
use sift_core::{AppError, AppResult};
use std::collections::HashSet;

/// Returns the `k` nodes most similar to an embedding, best first.
///
/// When `doc_filter` is given, only nodes whose [`Node::document_key`] is in
/// the set are eligible.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn top_k(
        &self,
        embedding: &[f32],
        k: usize,
        doc_filter: Option<&HashSet<String>>,
    ) -> AppResult<Vec<ScoredNode>>;
}

/// Brute-force cosine retriever over nodes held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRetriever {
    nodes: Vec<Node>,
}

impl InMemoryRetriever {
    /// Build from nodes. Every node must already carry an embedding.
    pub fn new(nodes: Vec<Node>) -> AppResult<Self> {
        let mut dimension = None;
        for node in &nodes {
            let Some(embedding) = &node.embedding else {
                return Err(AppError::Retrieval(format!(
                    "Node '{}' has no embedding",
                    node.id
                )));
            };
            match dimension {
                None => dimension = Some(embedding.len()),
                Some(d) if d != embedding.len() => {
                    return Err(AppError::Retrieval(format!(
                        "Node '{}' has dimension {}, expected {}",
                        node.id,
                        embedding.len(),
                        d
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn top_k(
        &self,
        embedding: &[f32],
        k: usize,
        doc_filter: Option<&HashSet<String>>,
    ) -> AppResult<Vec<ScoredNode>> {
        let mut scored: Vec<ScoredNode> = Vec::new();

        for node in &self.nodes {
            if doc_filter.is_some_and(|filter| !filter.contains(node.document_key())) {
                continue;
            }
            let Some(vector) = &node.embedding else {
                continue;
            };
            if vector.len() != embedding.len() {
                return Err(AppError::Retrieval(format!(
                    "Query dimension {} does not match index dimension {}",
                    embedding.len(),
                    vector.len()
                )));
            }
            scored.push(ScoredNode::new(node.clone(), cosine_similarity(embedding, vector)));
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        tracing::debug!(
            candidates = scored.len(),
            k,
            filtered = doc_filter.is_some(),
            "Retrieved candidates"
        );

        Ok(scored)
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn node(id: &str, doc: &str, embedding: Vec<f32>) -> Node {
        let metadata: Map<String, Value> = match json!({ "id": doc }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        Node::new(format!("text of {}", id), metadata)
            .with_id(id)
            .with_embedding(embedding)
    }

    fn retriever() -> InMemoryRetriever {
        InMemoryRetriever::new(vec![
            node("n1", "d1", vec![1.0, 0.0, 0.0]),
            node("n2", "d2", vec![0.8, 0.6, 0.0]),
            node("n3", "d2", vec![0.0, 0.0, 1.0]),
            node("n4", "d3", vec![-1.0, 0.0, 0.0]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_results_ordered_by_similarity() {
        let results = retriever().top_k(&[1.0, 0.1, 0.0], 3, None).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.node.id.as_str()).collect();

        assert_eq!(ids, vec!["n1", "n2", "n3"]);
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[tokio::test]
    async fn test_doc_filter_restricts_candidates() {
        let filter: HashSet<String> = ["d2".to_string()].into_iter().collect();
        let results = retriever()
            .top_k(&[1.0, 0.0, 0.0], 5, Some(&filter))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.node.document_id() == Some("d2")));
    }

    #[tokio::test]
    async fn test_doc_filter_matches_source_ids_of_loose_nodes() {
        let loose = Node::new("no document", Map::new())
            .with_id("n-only")
            .with_embedding(vec![0.0, 1.0, 0.0]);
        let retriever =
            InMemoryRetriever::new(vec![loose.clone(), node("n1", "d1", vec![1.0, 0.0, 0.0])])
                .unwrap();

        let filter: HashSet<String> = crate::source::Source::from_nodes(&[loose])
            .into_iter()
            .map(|s| s.id)
            .collect();
        let results = retriever
            .top_k(&[0.0, 1.0, 0.0], 5, Some(&filter))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.id, "n-only");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_retrieval_error() {
        let result = retriever().top_k(&[1.0, 0.0], 5, None).await;
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[test]
    fn test_nodes_without_embedding_rejected() {
        let result = InMemoryRetriever::new(vec![Node::new("x", Map::new())]);
        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
