//! Wiring of the answering pipeline from configuration and a corpus file.

use sift_core::{config::AppConfig, AppError, AppResult};
use sift_llm::create_client;
use sift_prompt::PromptLibrary;
use sift_rag::{
    AnswerEngine, ConversationController, Embedder, InMemoryRetriever, Message, Node,
    ProgressEmitter, ProgressEvent, Reply,
};
use std::path::Path;
use std::sync::Arc;

/// A ready-to-use pipeline over one corpus.
pub struct Session {
    controller: ConversationController,
}

impl Session {
    /// Build the pipeline: provider client, prompts, embedded corpus.
    pub async fn open(config: &AppConfig, corpus: &Path) -> AppResult<Self> {
        config.validate()?;

        let api_key = config.resolve_api_key();
        let client = create_client(
            &config.provider,
            config.endpoint.as_deref(),
            api_key.as_deref(),
        )?;
        let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);

        let mut nodes = load_corpus(corpus)?;
        let embedder = Embedder::new(Arc::clone(&client), &config.models.embedding);
        let embedded = embedder.embed_nodes(&mut nodes).await?;
        tracing::info!(nodes = nodes.len(), embedded, "Loaded corpus from {:?}", corpus);

        let retriever = Arc::new(InMemoryRetriever::new(nodes)?);
        let engine = AnswerEngine::new(
            Arc::clone(&client),
            Arc::clone(&prompts),
            retriever,
            &config.models,
        )
        .with_retrieval(&config.retrieval);

        let controller = ConversationController::new(
            Arc::new(engine),
            client,
            prompts,
            &config.models.conversation,
        );

        Ok(Self { controller })
    }

    pub async fn reply(
        &self,
        text: &str,
        history: &[Message],
        emitter: &ProgressEmitter,
    ) -> AppResult<Reply> {
        self.controller
            .generate_response(&Message::user(text), history, emitter)
            .await
    }
}

/// Read nodes from a JSON Lines file, one node per line.
pub fn load_corpus(path: &Path) -> AppResult<Vec<Node>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read corpus {:?}: {}", path, e))
    })?;

    let mut nodes = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let node: Node = serde_json::from_str(line).map_err(|e| {
            AppError::Serialization(format!("{:?} line {}: {}", path, number + 1, e))
        })?;
        nodes.push(node);
    }

    if nodes.is_empty() {
        return Err(AppError::Config(format!("Corpus {:?} contains no nodes", path)));
    }
    Ok(nodes)
}

/// Read a conversation saved as a JSON array of messages.
pub fn load_history(path: &Path) -> AppResult<Vec<Message>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&contents)?)
}

pub fn save_history(path: &Path, history: &[Message]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(history)?)?;
    Ok(())
}

/// Print progress events to stderr, as text or JSON lines.
pub fn print_progress(emitter: &ProgressEmitter, json: bool) {
    emitter.subscribe(move |event: &ProgressEvent| {
        if json {
            eprintln!("{}", event.to_json());
            return;
        }
        match event {
            ProgressEvent::ContextDecision(label) => eprintln!("[decision] {}", label.trim()),
            ProgressEvent::Subqueries(queries) => {
                eprintln!("[subqueries] {}", queries.len());
                for query in queries {
                    eprintln!("  - {}", query);
                }
            }
            ProgressEvent::Answers(pairs) => {
                let unanswered = pairs.iter().filter(|p| p.answer.is_empty()).count();
                eprintln!(
                    "[answers] {} answered, {} without sources; merging",
                    pairs.len() - unanswered,
                    unanswered
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_rag::SubQueryRecord;
    use tempfile::TempDir;

    #[test]
    fn test_load_corpus_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nodes.jsonl");
        std::fs::write(
            &path,
            r#"{"id": "n1", "text": "Zip2 was founded in 1995.", "metadata": {"id": "d1", "title": "Zip2"}}

{"text": "PayPal began as X.com.", "metadata": {"id": "d2"}, "embedding": [0.1, 0.2]}
"#,
        )
        .unwrap();

        let nodes = load_corpus(&path).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "n1");
        assert_eq!(nodes[1].embedding.as_deref(), Some(&[0.1, 0.2][..]));
    }

    #[test]
    fn test_load_corpus_reports_bad_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nodes.jsonl");
        std::fs::write(&path, "{\"text\": \"ok\"}\nnot json\n").unwrap();

        let err = load_corpus(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nodes.jsonl");
        std::fs::write(&path, "\n").unwrap();

        assert!(matches!(load_corpus(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_history_round_trip_through_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chats/history.json");
        assert!(load_history(&path).unwrap().is_empty());

        let history = vec![
            Message::user("Who founded Zip2?"),
            Message::ai(
                Some("Elon and Kimbal Musk.".to_string()),
                vec![SubQueryRecord::new("Who founded Zip2?", true).with_response("Elon and Kimbal Musk.")],
            ),
        ];
        save_history(&path, &history).unwrap();

        assert_eq!(load_history(&path).unwrap(), history);
    }
}
