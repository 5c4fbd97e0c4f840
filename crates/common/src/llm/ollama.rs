//! Ollama chat client

use super::{ChatRequest, LanguageModel};
use crate::config::{llm_retry_delay, LlmConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Client for a local Ollama server
pub struct OllamaClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Whether the server answers on `/api/tags`
    pub async fn check_connection(&self) -> bool {
        match self.client.get(format!("{}/api/tags", self.api_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, api_url = %self.api_url, "Ollama not reachable");
                false
            }
        }
    }

    /// Make request with retry
    async fn request_with_retry(&self, request: &ChatRequest) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(llm_retry_delay(attempt)).await;
            }

            match self.make_request(request).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!(
                        operation = request.operation,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Language model request failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::LanguageModel {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, request: &ChatRequest) -> Result<String> {
        let model = request.model.as_deref().unwrap_or(&self.model);

        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_prompt,
        });

        let body = OllamaChatRequest {
            model,
            messages,
            options: ChatOptions {
                temperature: request.temperature,
            },
            format: request.json_mode.then_some("json"),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.api_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LanguageModel {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LanguageModel {
                message: format!("Ollama API error {}: {}", status, text),
            });
        }

        let parsed: OllamaChatResponse =
            response.json().await.map_err(|e| AppError::LanguageModel {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.is_empty())
            .or(parsed.response)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let start = Instant::now();
        let result = self.request_with_retry(&request).await;

        metrics::record_llm_request(
            start.elapsed().as_secs_f64(),
            request.operation,
            result.is_ok(),
        );

        if let Ok(content) = &result {
            tracing::debug!(
                operation = request.operation,
                reply_len = content.len(),
                latency_ms = start.elapsed().as_millis() as u64,
                "Language model replied"
            );
        }

        result
    }

    async fn ping(&self) -> Result<()> {
        if self.check_connection().await {
            Ok(())
        } else {
            Err(AppError::LanguageModel {
                message: format!("Ollama not reachable at {}", self.api_url),
            })
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.api_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::LanguageModel {
                message: format!("Listing models failed with status {}", response.status()),
            });
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let body = OllamaChatRequest {
            model: "llama3.2:3b",
            messages: vec![
                ChatMessage { role: "system", content: "sys" },
                ChatMessage { role: "user", content: "hello" },
            ],
            options: ChatOptions { temperature: 0.2 },
            format: Some("json"),
            stream: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3.2:3b");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_response_falls_back_to_response_field() {
        let parsed: OllamaChatResponse =
            serde_json::from_str(r#"{"response": "legacy"}"#).unwrap();
        let content = parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.is_empty())
            .or(parsed.response)
            .unwrap_or_default();
        assert_eq!(content, "legacy");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = LlmConfig {
            api_url: "http://localhost:11434/".into(),
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.api_url, "http://localhost:11434");
        assert_eq!(client.model_name(), "llama3.2:3b");
    }
}
