//! Scripted generator for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{non_empty, GenerationError, PromptSections, TextGenerator};

/// Returns a fixed reply and remembers the prompts it was given
#[derive(Debug)]
pub struct ScriptedGenerator {
    reply: Result<String, String>,
    prompts: Mutex<Vec<PromptSections>>,
}

impl ScriptedGenerator {
    /// Always answer with `reply`
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with an API error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<PromptSections> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model_id(&self) -> &str {
        "scripted"
    }

    fn backend(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &PromptSections) -> Result<String, GenerationError> {
        match self.prompts.lock() {
            Ok(mut prompts) => prompts.push(prompt.clone()),
            Err(poisoned) => poisoned.into_inner().push(prompt.clone()),
        }
        match &self.reply {
            Ok(text) => non_empty(text.clone()),
            Err(message) => Err(GenerationError::Api {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}
