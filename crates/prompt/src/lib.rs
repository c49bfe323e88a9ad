//! Prompt system for Sift.
//!
//! This crate provides:
//! - Built-in Handlebars templates for every model-call stage
//! - YAML overrides loaded from `.sift/prompts/`
//! - Rendering with plain-text (unescaped) output

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{vars, PromptLibrary};
pub use loader::{list_prompts, load_prompt};
pub use types::{PromptDefinition, PromptId, PromptOrigin};
