//! Command handlers for the Sift CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod prompts;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use prompts::PromptsCommand;
