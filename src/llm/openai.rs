//! OpenAI chat completions backend.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{non_empty, GenerationError, PromptSections, TextGenerator};
use crate::utils::{FetchRequest, HttpClient};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiGenerator {
    pub fn new(
        client: Arc<HttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn backend(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &PromptSections) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
        });

        let request = FetchRequest::post_json(
            format!("{}/v1/chat/completions", self.base_url),
            body,
        )
        .header(AUTHORIZATION, &format!("Bearer {}", self.api_key));

        let response = self.client.fetch(request).await?;
        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        non_empty(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;

    fn generator(server: &mockito::Server) -> OpenAiGenerator {
        let transport = TransportConfig {
            max_attempts: 1,
            ..TransportConfig::default()
        };
        OpenAiGenerator::new(
            Arc::new(HttpClient::new(&transport).unwrap()),
            server.url(),
            "sk-test",
            "gpt-4",
            0.3,
        )
    }

    #[tokio::test]
    async fn test_generate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(
                r#"{"id":"c1","model":"gpt-4","choices":[
                    {"index":0,"message":{"role":"assistant","content":"1. Main objective: X"}}
                ]}"#,
            )
            .create_async()
            .await;

        let text = generator(&server)
            .generate(&PromptSections::new("s", "u"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "1. Main objective: X");
    }

    #[tokio::test]
    async fn test_no_choices_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = generator(&server)
            .generate(&PromptSections::new("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Empty));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = Arc::new(HttpClient::new(&TransportConfig::default()).unwrap());
        let generator = OpenAiGenerator::new(client, "http://x", "sk-secret", "gpt-4", 0.3);
        assert!(!format!("{:?}", generator).contains("sk-secret"));
    }
}
