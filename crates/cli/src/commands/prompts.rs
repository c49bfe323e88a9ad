//! Prompts command handler.
//!
//! Lists the active prompt templates and where each one comes from.

use clap::Args;
use sift_core::{config::AppConfig, AppResult};
use sift_prompt::{list_prompts, PromptId, PromptLibrary, PromptOrigin};

/// Show active prompt templates and their origin
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let library = PromptLibrary::load(&config.workspace)?;
        let unknown: Vec<String> = list_prompts(&config.workspace)?
            .into_iter()
            .filter(|stem| PromptId::parse(stem).is_none())
            .collect();

        let rows: Vec<(PromptId, String)> = PromptId::ALL
            .into_iter()
            .map(|id| (id, describe(library.origin(id))))
            .collect();

        if self.json {
            let output = serde_json::json!({
                "prompts": rows
                    .iter()
                    .map(|(id, origin)| serde_json::json!({ "id": id.as_str(), "origin": origin }))
                    .collect::<Vec<_>>(),
                "unknownOverrides": unknown,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        for (id, origin) in &rows {
            println!("{:<16} {}", id.as_str(), origin);
        }
        for stem in &unknown {
            tracing::warn!("Ignoring unknown prompt override: {}.yml", stem);
        }

        Ok(())
    }
}

fn describe(origin: Option<&PromptOrigin>) -> String {
    match origin {
        Some(PromptOrigin::BuiltIn) | None => "built-in".to_string(),
        Some(PromptOrigin::Workspace(path)) => format!("override ({})", path.display()),
    }
}
