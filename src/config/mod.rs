//! Configuration management.
//!
//! Configuration is read once at startup from an optional TOML file layered
//! with `RESEARCH_ASSISTANT__*` environment variables.
//!
//! ```toml
//! [transport]
//! connect_timeout_secs = 5
//! read_timeout_secs = 30
//! max_attempts = 10
//! backoff_base_ms = 2000
//! retry_statuses = [429, 500, 502, 503, 504]
//!
//! [transport.proxy]
//! http = "http://proxy:8080"
//! https = "http://proxy:8080"
//!
//! [search]
//! max_results_cap = 20
//!
//! [sources]
//! enabled = ["arxiv"]
//!
//! [generation]
//! backend = "ollama"
//! model = "llama3.2:latest"
//! base_url = "http://localhost:11434"
//! temperature = 0.1
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryPolicy;

/// Name of the configuration file looked up by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "research-assistant.toml";

/// Environment variable prefix for overrides (`RESEARCH_ASSISTANT__SEARCH__MAX_RESULTS_CAP=10`)
pub const ENV_PREFIX: &str = "RESEARCH_ASSISTANT";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP transport and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Total number of requests per fetch, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for each further retry
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Optional ceiling on a single backoff delay
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,

    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Browser-like agent used once when a request is rejected
    #[serde(default = "default_fallback_user_agent")]
    pub fallback_user_agent: Option<String>,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            max_backoff_ms: None,
            retry_statuses: default_retry_statuses(),
            user_agent: default_user_agent(),
            fallback_user_agent: default_fallback_user_agent(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Retry policy described by this section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            max_backoff: self.max_backoff_ms.map(Duration::from_millis),
            retry_statuses: self.retry_statuses.clone(),
            agent_fallback: self.fallback_user_agent.is_some(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    10
}

fn default_backoff_base() -> u64 {
    2000
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_user_agent() -> String {
    "ResearchAssistant/1.0".to_string()
}

fn default_fallback_user_agent() -> Option<String> {
    Some(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
            .to_string(),
    )
}

/// Proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub http: Option<String>,

    #[serde(default)]
    pub https: Option<String>,
}

/// Search limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Upper bound accepted for `max_results`
    #[serde(default = "default_max_results_cap")]
    pub max_results_cap: usize,

    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Raw entries requested per wanted record
    #[serde(default = "default_overfetch")]
    pub overfetch_factor: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results_cap: default_max_results_cap(),
            default_max_results: default_max_results(),
            overfetch_factor: default_overfetch(),
        }
    }
}

fn default_max_results_cap() -> usize {
    20
}

fn default_max_results() -> usize {
    crate::models::DEFAULT_MAX_RESULTS
}

fn default_overfetch() -> usize {
    2
}

/// Sources section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Enabled source ids, in merge order
    #[serde(default = "default_enabled_sources")]
    pub enabled: Vec<String>,

    #[serde(default)]
    pub arxiv: ArxivConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_sources(),
            arxiv: ArxivConfig::default(),
            semantic: SemanticConfig::default(),
        }
    }
}

fn default_enabled_sources() -> Vec<String> {
    vec!["arxiv".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivConfig {
    #[serde(default = "default_arxiv_url")]
    pub base_url: String,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: default_arxiv_url(),
        }
    }
}

fn default_arxiv_url() -> String {
    "https://export.arxiv.org/api/query".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    #[serde(default = "default_semantic_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            base_url: default_semantic_url(),
            api_key: None,
        }
    }
}

fn default_semantic_url() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

/// Which generative backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    Ollama,
    OpenAi,
}

/// Generative backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_backend")]
    pub backend: GenerationBackend,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_generation_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout; generation is much slower than metadata calls
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_generation_attempts")]
    pub max_attempts: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_model(),
            base_url: default_generation_url(),
            temperature: default_temperature(),
            api_key: None,
            timeout_secs: default_generation_timeout(),
            max_attempts: default_generation_attempts(),
        }
    }
}

fn default_backend() -> GenerationBackend {
    GenerationBackend::Ollama
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_generation_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_generation_attempts() -> u32 {
    3
}

/// Metadata API used to assemble content for analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_semantic_url")]
    pub base_url: String,

    #[serde(default = "default_metadata_fields")]
    pub fields: String,

    #[serde(default = "default_metadata_attempts")]
    pub max_attempts: u32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_semantic_url(),
            fields: default_metadata_fields(),
            max_attempts: default_metadata_attempts(),
        }
    }
}

fn default_metadata_fields() -> String {
    "title,abstract,year,authors,venue,publicationVenue,referenceCount,citationCount,openAccessPdf"
        .to_string()
}

fn default_metadata_attempts() -> u32 {
    3
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` switches the subscriber to JSON lines
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Fill unset secrets and proxies from the conventional environment
    /// variables (`HTTP_PROXY`, `HTTPS_PROXY`, `OPENAI_API_KEY`,
    /// `SEMANTIC_SCHOLAR_API_KEY`).
    pub fn with_env_fallbacks(mut self) -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if self.transport.proxy.http.is_none() {
            self.transport.proxy.http = env("HTTP_PROXY").or_else(|| env("http_proxy"));
        }
        if self.transport.proxy.https.is_none() {
            self.transport.proxy.https = env("HTTPS_PROXY").or_else(|| env("https_proxy"));
        }
        if self.generation.api_key.is_none() {
            self.generation.api_key = env("OPENAI_API_KEY");
        }
        if self.sources.semantic.api_key.is_none() {
            self.sources.semantic.api_key = env("SEMANTIC_SCHOLAR_API_KEY");
        }
        self
    }

    /// Write this configuration as TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Load configuration from a file, layered with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_layers(Some(path))
}

/// Defaults, then the file (if any), then `RESEARCH_ASSISTANT__*` variables
fn load_layers(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("sources.enabled")
                .with_list_parse_key("transport.retry_statuses"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Look for a configuration file in the working directory, then in the
/// user configuration directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("research-assistant").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Resolve the effective configuration: explicit path, discovered file, or defaults
pub fn get_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => match find_config_file() {
            Some(path) => {
                tracing::info!("Using config file: {}", path.display());
                load_config(&path)?
            }
            None => load_layers(None)?,
        },
    };

    Ok(config.with_env_fallbacks())
}
