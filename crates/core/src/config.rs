//! Configuration management for Sift.
//!
//! Configuration is assembled from several layers, later layers winning:
//! - Built-in defaults
//! - Config file (`.sift/config.yaml` or `SIFT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with most state stored in `.sift/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the completion/embedding factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .sift/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion/embedding provider ("ollama" or "openai")
    pub provider: String,

    /// Provider endpoint override
    pub endpoint: Option<String>,

    /// Explicit API key (takes precedence over `api_key_env`)
    pub api_key: Option<String>,

    /// Name of the environment variable holding the provider API key
    pub api_key_env: Option<String>,

    /// Per-stage model identifiers
    pub models: ModelsConfig,

    /// Retrieval and reranking knobs
    pub retrieval: RetrievalConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Model used by each pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Sub-question planner
    pub subquery: String,

    /// Candidate reranker
    pub reranker: String,

    /// Grounded answering
    pub answer: String,

    /// Sub-answer merging
    pub merge: String,

    /// Conversation strategy classification
    pub conversation: String,

    /// Query and node embeddings
    pub embedding: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            subquery: "llama3.1".to_string(),
            reranker: "llama3.2".to_string(),
            answer: "llama3.1".to_string(),
            merge: "llama3.1".to_string(),
            conversation: "llama3.1".to_string(),
            embedding: "nomic-embed-text".to_string(),
        }
    }
}

impl ModelsConfig {
    /// Default model names for the hosted OpenAI API.
    pub fn openai() -> Self {
        Self {
            subquery: "gpt-4o".to_string(),
            reranker: "gpt-4o-mini".to_string(),
            answer: "gpt-4o".to_string(),
            merge: "gpt-4o".to_string(),
            conversation: "gpt-4o".to_string(),
            embedding: "text-embedding-3-small".to_string(),
        }
    }
}

/// Retrieval and reranking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates fetched per query before reranking
    #[serde(rename = "topK")]
    pub top_k: usize,

    /// Cap on reranked nodes kept (unset = unlimited)
    #[serde(rename = "rerankTopN", skip_serializing_if = "Option::is_none")]
    pub rerank_top_n: Option<usize>,

    /// Cap on generated sub-questions (unset = model decides)
    #[serde(rename = "subqueryLimit", skip_serializing_if = "Option::is_none")]
    pub subquery_limit: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            rerank_top_n: None,
            subquery_limit: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    provider: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    models: Option<ModelsConfig>,
    retrieval: Option<RetrievalConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            endpoint: None,
            api_key: None,
            api_key_env: None,
            models: ModelsConfig::default(),
            retrieval: RetrievalConfig::default(),
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `SIFT_WORKSPACE`: Override workspace path
    /// - `SIFT_CONFIG`: Path to config file
    /// - `SIFT_PROVIDER`: Completion provider
    /// - `SIFT_ENDPOINT`: Provider endpoint
    /// - `SIFT_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use sift_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace and config file
    /// taking precedence over `SIFT_WORKSPACE` and `SIFT_CONFIG`.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| std::env::var("SIFT_WORKSPACE").ok().map(PathBuf::from)) {
            config.workspace = workspace;
        }

        if let Some(config_file) = config_file.or_else(|| std::env::var("SIFT_CONFIG").ok().map(PathBuf::from)) {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.sift_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("SIFT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(endpoint) = std::env::var("SIFT_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }

        config.api_key = std::env::var("SIFT_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.clone().apply_file(config_file))
    }

    fn apply_file(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.log_json = json;
            }
        }

        if let Some(provider) = file.provider {
            // Switching to the hosted provider without naming models picks its defaults
            if provider == "openai" && file.models.is_none() {
                self.models = ModelsConfig::openai();
            }
            self.provider = provider;
        }

        if file.endpoint.is_some() {
            self.endpoint = file.endpoint;
        }

        if file.api_key_env.is_some() {
            self.api_key_env = file.api_key_env;
        }

        if let Some(models) = file.models {
            self.models = models;
        }

        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        endpoint: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(endpoint) = endpoint {
            self.endpoint = Some(endpoint);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .sift directory.
    pub fn sift_dir(&self) -> PathBuf {
        self.workspace.join(".sift")
    }

    /// Resolve the provider API key.
    ///
    /// An explicit key wins; otherwise the variable named by `api_key_env`
    /// (default `OPENAI_API_KEY` for the openai provider) is read.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match (&self.api_key_env, self.provider.as_str()) {
            (Some(var), _) => var.clone(),
            (None, "openai") => "OPENAI_API_KEY".to_string(),
            (None, _) => return None,
        };

        std::env::var(env_var).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.rerank_top_n == Some(0) {
            return Err(AppError::Config(
                "retrieval.rerankTopN must be greater than zero when set".to_string(),
            ));
        }

        if self.provider == "openai" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found (set SIFT_API_KEY or {})",
                self.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
            )));
        }

        Ok(())
    }
}
