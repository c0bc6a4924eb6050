//! Local Ollama backend.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{non_empty, GenerationError, PromptSections, TextGenerator};
use crate::utils::{FetchRequest, HttpClient};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Arc<HttpClient>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(
        client: Arc<HttpClient>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn backend(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &PromptSections) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "system": prompt.system,
            "prompt": prompt.user,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let response = self
            .client
            .fetch(FetchRequest::post_json(
                format!("{}/api/generate", self.base_url),
                body,
            ))
            .await?;

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        tracing::debug!("Ollama produced {} bytes", parsed.response.len());
        non_empty(parsed.response)
    }
}
