//! Query value object.

use sift_core::{AppError, AppResult};
use std::fmt;
use std::sync::Arc;

/// A question paired with its embedding.
///
/// Immutable once built. Cloning shares the embedding buffer, so a query can
/// be handed to concurrent sub-question tasks freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    embedding: Arc<[f32]>,
}

impl Query {
    /// Build a query. Fails with [`AppError::Validation`] on empty text.
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> AppResult<Self> {
        let text = text.into();
        ensure_text(&text)?;
        Ok(Self {
            text,
            embedding: embedding.into(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Reject empty query text.
pub(crate) fn ensure_text(text: &str) -> AppResult<()> {
    if text.is_empty() {
        return Err(AppError::Validation(
            "Query text cannot be empty".to_string(),
        ));
    }
    Ok(())
}
