//! Edge handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use papergraph_common::{context::ChatMessage, errors::Result};
use papergraph_graph::RelationshipOutcome;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,

    /// Earlier turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// Re-run classification of an existing edge
pub async fn analyze_edge(
    State(state): State<AppState>,
    Path(edge_id): Path<String>,
) -> Result<Json<RelationshipOutcome>> {
    let outcome = state.controller.analyze_edge(&edge_id).await?;
    Ok(Json(outcome))
}

/// Ask a question about the two papers an edge connects
pub async fn chat(
    State(state): State<AppState>,
    Path(edge_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate()?;
    let answer = state
        .controller
        .chat(&edge_id, &request.question, &request.history)
        .await?;
    Ok(Json(ChatResponse { answer }))
}
