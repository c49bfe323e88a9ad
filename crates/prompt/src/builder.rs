//! Prompt library: registers templates and renders them with variables.

use crate::defaults;
use crate::loader::{load_prompt, prompts_dir};
use crate::types::{PromptId, PromptOrigin};
use handlebars::Handlebars;
use sift_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// The set of active templates, one per [`PromptId`].
///
/// Built once per process and shared read-only by every pipeline stage.
pub struct PromptLibrary {
    registry: Handlebars<'static>,
    origins: HashMap<PromptId, PromptOrigin>,
}

impl std::fmt::Debug for PromptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptLibrary")
            .field("origins", &self.origins)
            .finish()
    }
}

impl PromptLibrary {
    /// Library holding only the built-in templates.
    pub fn builtin() -> AppResult<Self> {
        let mut library = Self {
            registry: new_registry(),
            origins: HashMap::new(),
        };

        for id in PromptId::ALL {
            library.register(id, defaults::template(id), PromptOrigin::BuiltIn)?;
        }

        Ok(library)
    }

    /// Built-in templates, replaced by any `.sift/prompts/<id>.yml` override.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut library = Self::builtin()?;
        let dir = prompts_dir(workspace_path);

        for id in PromptId::ALL {
            let path = dir.join(format!("{}.yml", id));
            if !path.exists() {
                continue;
            }
            let definition = load_prompt(workspace_path, id)?;
            library.register(id, &definition.template, PromptOrigin::Workspace(path))?;
        }

        Ok(library)
    }

    /// Replace the template for one prompt.
    pub fn register(&mut self, id: PromptId, template: &str, origin: PromptOrigin) -> AppResult<()> {
        self.registry
            .register_template_string(id.as_str(), template)
            .map_err(|e| AppError::Prompt(format!("Failed to register template '{}': {}", id, e)))?;
        self.origins.insert(id, origin);
        Ok(())
    }

    /// Where the active template for `id` came from.
    pub fn origin(&self, id: PromptId) -> Option<&PromptOrigin> {
        self.origins.get(&id)
    }

    /// Render a prompt. Missing variables render as empty strings.
    pub fn render(&self, id: PromptId, variables: &HashMap<String, String>) -> AppResult<String> {
        let rendered = self
            .registry
            .render(id.as_str(), variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", id, e)))?;

        tracing::trace!(prompt = %id, bytes = rendered.len(), "Rendered prompt");
        Ok(rendered)
    }
}

fn new_registry() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    // Prompts are plain text, never HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

/// Build a variable map from `(name, value)` pairs.
pub fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
