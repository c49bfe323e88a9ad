//! Ask command handler.
//!
//! Answers one question over a corpus, optionally continuing and saving a
//! conversation kept in a JSON file.

use crate::session::{load_history, print_progress, save_history, Session};
use clap::Args;
use sift_core::{config::AppConfig, AppError, AppResult};
use sift_rag::{Message, ProgressEmitter};
use std::path::PathBuf;

/// Answer a question over a corpus
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Corpus of nodes as JSON Lines
    #[arg(long)]
    pub corpus: PathBuf,

    /// Conversation history file (JSON array of messages)
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Append this exchange to the history file
    #[arg(long, requires = "history")]
    pub save: bool,

    /// Output the reply, with sub-questions and sources, as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not print progress events
    #[arg(short, long)]
    pub quiet: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut history = match &self.history {
            Some(path) => load_history(path)?,
            None => Vec::new(),
        };

        let session = Session::open(config, &self.corpus).await?;

        let emitter = ProgressEmitter::new();
        if !self.quiet {
            print_progress(&emitter, self.json);
        }

        let reply = session.reply(&self.question, &history, &emitter).await?;

        if self.json {
            let output = serde_json::json!({
                "answer": reply.answer,
                "subqueries": reply.subqueries,
                "provider": config.provider,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", reply.answer);
        }

        if self.save {
            let path = self.history.as_ref().ok_or_else(|| {
                AppError::Config("--save requires --history".to_string())
            })?;
            history.push(Message::user(&self.question));
            history.push(reply.into_message());
            save_history(path, &history)?;
            tracing::info!("Saved {} messages to {:?}", history.len(), path);
        }

        Ok(())
    }
}
