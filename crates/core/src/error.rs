//! Error types for Sift.
//!
//! A single enum covers every failure the pipeline can surface. The first five
//! variants are the pipeline's own taxonomy; the rest are ambient failures of
//! configuration, I/O, providers and templating.

use thiserror::Error;

/// Unified error type for Sift.
///
/// Every pipeline stage returns `Result<T, AppError>`. All variants are fatal
/// to the current request; nothing in the pipeline retries.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid input: empty query, conflicting retrieval flags, empty merge input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Sub-question planning failed or produced unusable content
    #[error("Generation error: {0}")]
    Generation(String),

    /// Reranker output was not a well-formed ranking of the candidates
    #[error("Rerank parse error: {0}")]
    RerankParse(String),

    /// A closed-set classification returned a label outside the set
    #[error("Unexpected model output: {0}")]
    UnexpectedModelOutput(String),

    /// Retriever collaborator failure
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion/embedding provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
