//! Query-answering pipeline.
//!
//! A user message flows through the [`ConversationController`], which decides
//! whether prior sources can be reused, then through the [`AnswerEngine`]:
//! sub-question planning, concurrent retrieve/rerank/answer per sub-question,
//! and a final merge. Intermediate artifacts are broadcast through a
//! [`ProgressEmitter`].

pub mod answer;
pub mod controller;
pub mod embeddings;
pub mod emitter;
pub mod merger;
pub mod message;
pub mod node;
pub mod planner;
pub mod query;
pub mod reranker;
pub mod retriever;
pub mod source;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use answer::{AnswerEngine, DecompositionOptions, Reply};
pub use controller::{Classification, ConversationController, RetrievalStrategy};
pub use embeddings::Embedder;
pub use emitter::{ProgressEmitter, ProgressEvent, SubqueryAnswer};
pub use merger::ResponseMerger;
pub use message::{Message, SubQueryRecord};
pub use node::{Node, ScoredNode};
pub use planner::SubqueryPlanner;
pub use query::Query;
pub use reranker::Reranker;
pub use retriever::{InMemoryRetriever, Retriever};
pub use source::Source;
