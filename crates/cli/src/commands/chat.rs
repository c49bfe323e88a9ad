//! Chat command handler.
//!
//! Line-oriented conversation; history lives in memory for the session.

use crate::session::{load_history, print_progress, save_history, Session};
use clap::Args;
use sift_core::{config::AppConfig, AppResult};
use sift_rag::{Message, ProgressEmitter};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive conversation over a corpus
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Corpus of nodes as JSON Lines
    #[arg(long)]
    pub corpus: PathBuf,

    /// Resume from, and save to, this history file
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Do not print progress events
    #[arg(short, long)]
    pub quiet: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let session = Session::open(config, &self.corpus).await?;
        let mut history = match &self.history {
            Some(path) => load_history(path)?,
            None => Vec::new(),
        };

        let emitter = ProgressEmitter::new();
        if !self.quiet {
            print_progress(&emitter, false);
        }

        eprintln!("Type a question, /reset to start over, /exit to quit.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            eprint!("> ");
            std::io::stderr().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let text = line.trim();

            match text {
                "" => continue,
                "/exit" | "/quit" => break,
                "/reset" => {
                    history.clear();
                    eprintln!("History cleared.");
                    continue;
                }
                _ => {}
            }

            match session.reply(text, &history, &emitter).await {
                Ok(reply) => {
                    println!("{}\n", reply.answer);
                    history.push(Message::user(text));
                    history.push(reply.into_message());
                    if let Some(path) = &self.history {
                        save_history(path, &history)?;
                    }
                }
                Err(e) => {
                    tracing::error!("Reply failed: {}", e);
                    eprintln!("Error: {}", e);
                }
            }
        }

        tracing::info!("Chat ended after {} messages", history.len());
        Ok(())
    }
}
