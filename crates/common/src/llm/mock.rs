//! Mock language model for development and testing

use super::{ChatRequest, LanguageModel};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

/// Replays scripted replies in order, then repeats a default reply.
/// Every request is recorded for inspection.
pub struct MockLanguageModel {
    script: Mutex<VecDeque<MockReply>>,
    default: MockReply,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockLanguageModel {
    fn with_default(default: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_default(MockReply::Text(text.into()))
    }

    /// Always fails as if the endpoint were unreachable
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_default(MockReply::Fail(message.into()))
    }

    /// Stand-in used when no model is configured
    pub fn offline() -> Self {
        Self::failing("mock language model is offline")
    }

    /// Queue a reply to be returned before the default
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(MockReply::Text(text.into()));
        self
    }

    /// Queue a failure to be returned before the default
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(MockReply::Fail(message.into()));
        self
    }

    fn push(&self, reply: MockReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let reply = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.default.clone());

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(message) => Err(AppError::LanguageModel { message }),
        }
    }

    async fn ping(&self) -> Result<()> {
        match &self.default {
            MockReply::Text(_) => Ok(()),
            MockReply::Fail(message) => Err(AppError::LanguageModel {
                message: message.clone(),
            }),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.ping().await?;
        Ok(vec![self.model_name().to_string()])
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}
