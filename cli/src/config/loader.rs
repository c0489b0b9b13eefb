//! Configuration discovery and loading for the devmate CLI
//!
//! Single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./devmate.json or ./.devmate/config.json
//! 3. XDG config: ~/.config/devmate/config.json
//! 4. Environment variables only (no files)

use anyhow::{anyhow, Context, Result};
use devmate_core::config::{
    Config, LlmSettings, ModelParams, RetrievalSettings, SandboxSettings, WorkerSettings,
};
use devmate_core::AgentConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw configuration file format (simple single-file schema).
///
/// Secrets may be written as "env:VAR_NAME" to pull the value from the
/// environment at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConfig {
    /// API key for the OpenAI-compatible endpoint (can be "env:VAR_NAME")
    pub api_key: String,
    /// Base URL (optional, defaults to the OpenAI endpoint)
    pub base_url: Option<String>,
    /// Chat model name
    pub model: Option<String>,
    /// Embedding model name
    pub embedding_model: Option<String>,
    /// Tavily API key handed to the search worker (can be "env:VAR_NAME")
    pub tavily_api_key: Option<String>,
    /// Model parameters (optional)
    #[serde(default)]
    pub params: ModelParams,
    /// Retrieval settings (optional)
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    /// Sandbox settings (optional)
    #[serde(default)]
    pub sandbox: SandboxSettings,
    /// Search worker settings (optional, defaults to the bundled worker)
    pub worker: Option<WorkerSettings>,
    /// Agent settings (optional)
    #[serde(default)]
    pub agent: AgentConfig,
}

/// CLI configuration loader
pub struct CliConfigLoader {
    config_override: Option<PathBuf>,
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
    max_iterations_override: Option<usize>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            config_override: None,
            api_key_override: None,
            base_url_override: None,
            model_override: None,
            max_iterations_override: None,
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Set API key override
    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    /// Set base URL override
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Set model override
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Set turn iteration cap override
    pub fn with_max_iterations_override(mut self, max_iterations: usize) -> Self {
        self.max_iterations_override = Some(max_iterations);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<Config> {
        let mut raw = if let Some(override_path) = &self.config_override {
            self.load_from_path(override_path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        if let Some(api_key) = &self.api_key_override {
            raw.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url_override {
            raw.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            raw.model = Some(model.clone());
        }
        if let Some(max_iterations) = self.max_iterations_override {
            raw.agent.max_turn_iterations = max_iterations;
        }

        resolve_config(raw)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<RawConfig> {
        if let Some(config) = self.try_load_cwd().await? {
            return Ok(config);
        }
        if let Some(config) = self.try_load_xdg().await? {
            return Ok(config);
        }
        self.load_env_only()
    }

    /// Try loading from current working directory
    async fn try_load_cwd(&self) -> Result<Option<RawConfig>> {
        let cwd = std::env::current_dir()?;

        let devmate_json = cwd.join("devmate.json");
        if devmate_json.exists() {
            return Ok(Some(self.load_file(&devmate_json).await?));
        }

        let dir_config = cwd.join(".devmate").join("config.json");
        if dir_config.exists() {
            return Ok(Some(self.load_file(&dir_config).await?));
        }

        Ok(None)
    }

    /// Try loading from the XDG config directory
    async fn try_load_xdg(&self) -> Result<Option<RawConfig>> {
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("devmate").join("config.json");
            if config_path.exists() {
                return Ok(Some(self.load_file(&config_path).await?));
            }
        }
        Ok(None)
    }

    /// Build a config from environment variables alone
    fn load_env_only(&self) -> Result<RawConfig> {
        let api_key = std::env::var("DEVMATE_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                anyhow!(
                    "No configuration found. Create a devmate.json file or set \
                     OPENAI_API_KEY / DEVMATE_API_KEY"
                )
            })?;

        Ok(RawConfig {
            api_key,
            base_url: std::env::var("DEVMATE_BASE_URL")
                .or_else(|_| std::env::var("OPENAI_BASE_URL"))
                .ok(),
            model: std::env::var("DEVMATE_MODEL").ok(),
            embedding_model: std::env::var("DEVMATE_EMBEDDING_MODEL").ok(),
            tavily_api_key: std::env::var("TAVILY_API_KEY").ok(),
            params: ModelParams::default(),
            retrieval: RetrievalSettings::default(),
            sandbox: SandboxSettings::default(),
            worker: None,
            agent: AgentConfig::default(),
        })
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RawConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<RawConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl Default for CliConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a raw config into the validated struct core accepts
fn resolve_config(raw: RawConfig) -> Result<Config> {
    let api_key = resolve_secret(&raw.api_key)?;

    let llm = LlmSettings {
        base_url: raw
            .base_url
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        api_key,
        model: raw.model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        embedding_model: raw
            .embedding_model
            .unwrap_or_else(|| "text-embedding-3-small".to_string()),
        params: raw.params,
    };

    let mut worker = raw.worker.unwrap_or_else(default_worker_settings);

    // The worker resolves its search backend key from its own environment;
    // pass it through explicitly so a spawned worker never depends on
    // whatever shell the CLI happened to inherit.
    if let Some(tavily_key) = &raw.tavily_api_key {
        let resolved = resolve_secret(tavily_key)?;
        worker
            .env
            .entry("TAVILY_API_KEY".to_string())
            .or_insert(resolved);
    }

    let config = Config {
        llm,
        retrieval: raw.retrieval,
        sandbox: raw.sandbox,
        worker,
        agent: raw.agent,
    };

    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}

/// Resolve a possibly env-indirected secret ("env:VAR_NAME")
fn resolve_secret(value: &str) -> Result<String> {
    if let Some(var_name) = value.strip_prefix("env:") {
        std::env::var(var_name)
            .with_context(|| format!("Environment variable not found: {}", var_name))
    } else {
        Ok(value.to_string())
    }
}

/// Default worker command: the `devmate-search` binary that ships next to
/// the `devmate` binary, falling back to PATH lookup.
fn default_worker_settings() -> WorkerSettings {
    let command = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("devmate-search")))
        .filter(|sibling| sibling.exists())
        .map(|sibling| sibling.to_string_lossy().to_string())
        .unwrap_or_else(|| "devmate-search".to_string());

    WorkerSettings {
        command: vec![command],
        ..Default::default()
    }
}
