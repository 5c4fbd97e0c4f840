//! Language model collaborator
//!
//! The model is treated as an opaque chat endpoint: one system instruction,
//! one user instruction, free text back. Providers:
//! - Ollama (local `/api/chat`)
//! - Mock (canned replies, for development and tests)

mod mock;
mod ollama;
mod reply;

pub use mock::MockLanguageModel;
pub use ollama::OllamaClient;
pub use reply::{parse_json_reply, strip_code_fences, ReplyError};

use crate::config::LlmConfig;
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A single chat-style request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Label used in logs and metrics, e.g. `concepts`
    pub operation: &'static str,

    /// Overrides the client's configured model
    pub model: Option<String>,

    pub system_prompt: String,

    pub user_prompt: String,

    pub temperature: f32,

    /// Ask the endpoint to constrain output to JSON
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn new(
        operation: &'static str,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            model: None,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.3,
            json_mode: false,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Trait for chat completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one request and return the raw reply text
    async fn complete(&self, request: ChatRequest) -> Result<String>;

    /// Check that the endpoint is reachable
    async fn ping(&self) -> Result<()>;

    /// Names of the models the endpoint can serve
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![self.model_name().to_string()])
    }

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a language model client based on configuration
pub fn create_language_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaClient::new(config)?)),
        "mock" => Ok(Arc::new(MockLanguageModel::offline())),
        other => {
            tracing::warn!(provider = other, "Unknown language model provider, using mock");
            Ok(Arc::new(MockLanguageModel::offline()))
        }
    }
}
