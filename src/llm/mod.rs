//! Generative text backends.
//!
//! Backends:
//!   OllamaGenerator  - local Ollama server (`/api/generate`)
//!   OpenAiGenerator  - OpenAI chat completions (`/v1/chat/completions`)
//!   ScriptedGenerator - canned output for tests
//!
//! Requests go through the same retrying [`HttpClient`] as searches, with the
//! attempt budget and timeout from the `[generation]` config section.

mod ollama;
mod openai;

pub mod mock;

pub use mock::ScriptedGenerator;
pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, GenerationBackend, GenerationConfig};
use crate::utils::{HttpClient, NetworkError};

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";
const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Transport failure (connection, timeout, exhausted retries)
    #[error("Generation request failed: {0}")]
    Http(NetworkError),

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    /// The backend answered with something other than the expected JSON
    #[error("Unexpected backend response: {0}")]
    Malformed(String),

    #[error("Backend returned empty output")]
    Empty,

    #[error("Backend misconfigured: {0}")]
    Config(String),
}

impl From<NetworkError> for GenerationError {
    fn from(err: NetworkError) -> Self {
        match err.status() {
            Some(status) => GenerationError::Api {
                status,
                message: err.to_string(),
            },
            None => GenerationError::Http(err),
        }
    }
}

/// System instruction plus user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSections {
    pub system: String,
    pub user: String,
}

impl PromptSections {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    /// Model identifier sent to the backend
    fn model_id(&self) -> &str;

    /// Short backend name, e.g. "ollama"
    fn backend(&self) -> &str;

    /// Generate text. Blank output is an error ([`GenerationError::Empty`]).
    async fn generate(&self, prompt: &PromptSections) -> Result<String, GenerationError>;
}

pub(crate) fn non_empty(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(text)
    }
}

/// Transport tuned for generation: longer timeout, own attempt budget
fn generation_client(config: &Config) -> Result<HttpClient, GenerationError> {
    let mut transport = config.transport.clone();
    transport.read_timeout_secs = config.generation.timeout_secs;
    let policy = transport
        .retry_policy()
        .max_attempts(config.generation.max_attempts);
    HttpClient::new(&transport)
        .map(|client| client.with_policy(policy))
        .map_err(|e| GenerationError::Config(e.to_string()))
}

fn resolve_base_url(generation: &GenerationConfig) -> String {
    let base = generation.base_url.trim_end_matches('/');
    match generation.backend {
        // the shipped default points at Ollama
        GenerationBackend::OpenAi if base == OLLAMA_DEFAULT_URL => OPENAI_DEFAULT_URL.to_string(),
        _ => base.to_string(),
    }
}

/// Build the backend selected in `[generation]`
pub fn generator_from_config(config: &Config) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    let client = Arc::new(generation_client(config)?);
    let generation = &config.generation;
    let base_url = resolve_base_url(generation);
    tracing::debug!(
        "Using {:?} backend at {} with model {}",
        generation.backend,
        base_url,
        generation.model
    );

    let generator: Arc<dyn TextGenerator> = match generation.backend {
        GenerationBackend::Ollama => Arc::new(OllamaGenerator::new(
            client,
            base_url,
            generation.model.clone(),
            generation.temperature,
        )),
        GenerationBackend::OpenAi => {
            let api_key = generation
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    GenerationError::Config(
                        "the openai backend needs an API key (OPENAI_API_KEY)".to_string(),
                    )
                })?;
            Arc::new(OpenAiGenerator::new(
                client,
                base_url,
                api_key,
                generation.model.clone(),
                generation.temperature,
            ))
        }
    };
    Ok(generator)
}
