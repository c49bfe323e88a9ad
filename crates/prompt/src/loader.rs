//! Prompt loader for YAML prompt overrides.

use crate::types::{PromptDefinition, PromptId};
use sift_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Directory holding prompt overrides inside a workspace.
pub fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".sift/prompts")
}

/// Load a prompt override by ID from the workspace.
///
/// Reads `.sift/prompts/<id>.yml` and validates it.
///
/// # Example
/// ```no_run
/// use sift_prompt::{load_prompt, PromptId};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), PromptId::Merge)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: PromptId) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition, prompt_id)?;

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all prompt override IDs present in the workspace.
///
/// Unknown stems are included so callers can flag stray files.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition, expected: PromptId) -> AppResult<()> {
    if def.id != expected.as_str() {
        return Err(AppError::Prompt(format!(
            "Prompt file for '{}' declares id '{}'",
            expected, def.id
        )));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
