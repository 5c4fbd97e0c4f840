//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub language_model: ModelCheck,
}

/// Reachability of the language model endpoint
#[derive(Serialize)]
pub struct ModelCheck {
    pub status: &'static str,
    /// Configured model name
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Whether the endpoint lists the configured model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelCheck {
    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: papergraph_common::VERSION,
    })
}

/// Readiness probe: the graph works without the model, but every
/// expansion and analysis would fall back
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let check = check_language_model(&state).await;

    Json(ReadyResponse {
        status: if check.is_up() { "ready" } else { "not_ready" },
        checks: ReadyChecks {
            language_model: check,
        },
    })
}

async fn check_language_model(state: &AppState) -> ModelCheck {
    let model = state.llm.model_name().to_string();
    let started = Instant::now();

    if let Err(e) = state.llm.ping().await {
        return ModelCheck {
            status: "down",
            model,
            latency_ms: None,
            model_available: None,
            error: Some(e.to_string()),
        };
    }
    let latency_ms = started.elapsed().as_millis() as u64;

    let model_available = match state.llm.list_models().await {
        Ok(models) => Some(models.iter().any(|name| name == &model)),
        Err(e) => {
            tracing::debug!(error = %e, "Model listing failed");
            None
        }
    };

    ModelCheck {
        status: "up",
        model,
        latency_ms: Some(latency_ms),
        model_available,
        error: None,
    }
}
