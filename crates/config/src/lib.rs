//! Configuration loading, validation, and management for DocForge.
//!
//! Loads configuration from `~/.docforge/config.toml`, then a `.env` file,
//! then environment variable overrides. Validates all settings at startup.

use docforge_core::ModelProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.docforge/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used when a request does not name one
    #[serde(default)]
    pub default_provider: ModelProvider,

    /// Sampling temperature for drafting
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per drafting response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Provider credentials and endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Research loop settings
    #[serde(default)]
    pub research: ResearchConfig,

    /// Drafting step settings
    #[serde(default)]
    pub drafting: DraftingConfig,

    /// Renderer settings
    #[serde(default)]
    pub render: RenderConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Job registry settings
    #[serde(default)]
    pub jobs: JobsConfig,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderConfig::openai")]
    pub openai: ProviderConfig,

    #[serde(default = "ProviderConfig::anthropic")]
    pub anthropic: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: ProviderConfig::openai(),
            anthropic: ProviderConfig::anthropic(),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, provider: ModelProvider) -> &ProviderConfig {
        match provider {
            ModelProvider::OpenAi => &self.openai,
            ModelProvider::Anthropic => &self.anthropic,
        }
    }
}

/// Per-provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override (e.g. a proxy or a test server)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    pub model: String,
}

impl ProviderConfig {
    fn openai() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: "gpt-4o".into(),
        }
    }

    fn anthropic() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: "claude-3-5-sonnet-20241022".into(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Round budget for the research loop
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Cap on snippets handed to drafting
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,

    /// Per tool call timeout
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    #[serde(default = "default_search_api_url")]
    pub search_api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_api_key: Option<String>,

    /// Results requested per search call
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default = "default_wiki_api_url")]
    pub wiki_api_url: String,
}

fn default_max_rounds() -> usize {
    3
}
fn default_max_snippets() -> usize {
    20
}
fn default_tool_timeout() -> u64 {
    10
}
fn default_search_api_url() -> String {
    "https://api.search.example.com/search".into()
}
fn default_search_limit() -> usize {
    5
}
fn default_wiki_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_snippets: default_max_snippets(),
            tool_timeout_secs: default_tool_timeout(),
            search_api_url: default_search_api_url(),
            search_api_key: None,
            search_limit: default_search_limit(),
            wiki_api_url: default_wiki_api_url(),
        }
    }
}

impl std::fmt::Debug for ResearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchConfig")
            .field("max_rounds", &self.max_rounds)
            .field("max_snippets", &self.max_snippets)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("search_api_url", &self.search_api_url)
            .field("search_api_key", &redact(&self.search_api_key))
            .field("search_limit", &self.search_limit)
            .field("wiki_api_url", &self.wiki_api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftingConfig {
    /// Total drafting attempts before the job fails
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_drafting_timeout")]
    pub timeout_secs: u64,
}

fn default_max_attempts() -> usize {
    2
}
fn default_drafting_timeout() -> u64 {
    180
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_secs: default_drafting_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Where rendered documents land
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where `save_artifact` writes drafts
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,

    /// Persist the raw drafted outline as JSON
    #[serde(default)]
    pub save_drafts: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_scratch_dir() -> PathBuf {
    PathBuf::from("tmp")
}
fn default_render_timeout() -> u64 {
    120
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            scratch_dir: default_scratch_dir(),
            timeout_secs: default_render_timeout(),
            save_drafts: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Drop finished jobs older than this. Unset keeps them for the
    /// lifetime of the process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_secs: Option<u64>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.docforge/config.toml).
    ///
    /// A `.env` file in the working directory is read first, then these
    /// environment variables override the file:
    /// - `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `SEARCH_API_KEY`
    /// - `DOCFORGE_PROVIDER`
    /// - `DOCFORGE_OUTPUT_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    ///
    /// Keys from the environment win over the file. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.providers.anthropic.api_key = Some(key);
        }
        if let Some(key) = get("SEARCH_API_KEY") {
            self.research.search_api_key = Some(key);
        }
        if let Some(provider) = get("DOCFORGE_PROVIDER") {
            self.default_provider = provider
                .parse()
                .map_err(ConfigError::ValidationError)?;
        }
        if let Some(dir) = get("DOCFORGE_OUTPUT_DIR") {
            self.render.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docforge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.research.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_rounds must be at least 1".into(),
            ));
        }

        if self.drafting.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "drafting.max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Whether the given provider has a credential.
    pub fn has_api_key(&self, provider: ModelProvider) -> bool {
        self.providers.get(provider).api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: ModelProvider::default(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            providers: ProvidersConfig::default(),
            research: ResearchConfig::default(),
            drafting: DraftingConfig::default(),
            render: RenderConfig::default(),
            gateway: GatewayConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider, ModelProvider::OpenAi);
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.research.max_rounds, 3);
        assert_eq!(config.drafting.max_attempts, 2);
        assert!(config.jobs.retention_secs.is_none());
    }

    #[test]
    fn default_models() {
        let config = AppConfig::default();
        assert_eq!(config.providers.openai.model, "gpt-4o");
        assert_eq!(config.providers.anthropic.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.providers.anthropic.model, config.providers.anthropic.model);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_budgets_rejected() {
        let mut config = AppConfig::default();
        config.research.max_rounds = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.drafting.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().gateway.port, 5000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_provider = "anthropic"

[research]
max_rounds = 5

[providers.openai]
model = "gpt-4o-mini"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider, ModelProvider::Anthropic);
        assert_eq!(config.research.max_rounds, 5);
        assert_eq!(config.research.max_snippets, 20);
        assert_eq!(config.providers.openai.model, "gpt-4o-mini");
        assert_eq!(config.providers.anthropic.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = \"hot\"").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("SEARCH_API_KEY", "search-key"),
            ("DOCFORGE_PROVIDER", "anthropic"),
            ("DOCFORGE_OUTPUT_DIR", "/tmp/docs"),
            ("ANTHROPIC_API_KEY", "  "),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-test"));
        assert!(config.providers.anthropic.api_key.is_none());
        assert_eq!(config.research.search_api_key.as_deref(), Some("search-key"));
        assert_eq!(config.default_provider, ModelProvider::Anthropic);
        assert_eq!(config.render.output_dir, PathBuf::from("/tmp/docs"));
        assert!(config.has_api_key(ModelProvider::OpenAi));
    }

    #[test]
    fn unknown_provider_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|k| (k == "DOCFORGE_PROVIDER").then(|| "gemini".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig::default();
        config.providers.openai.api_key = Some("sk-secret".into());
        config.research.search_api_key = Some("search-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("search-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openai"));
        assert!(toml_str.contains("5000"));
        assert!(toml_str.contains("gpt-4o"));
    }
}
