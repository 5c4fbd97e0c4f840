//! Whole-graph handlers

use axum::{extract::State, Json};
use papergraph_common::config::LayoutDirection;
use papergraph_common::errors::Result;
use papergraph_graph::GraphState;
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LayoutRequest {
    /// Overrides the configured direction for this run
    #[serde(default)]
    pub direction: Option<LayoutDirection>,
}

/// Current nodes and edges
pub async fn get_graph(State(state): State<AppState>) -> Json<GraphState> {
    let snapshot = state.controller.snapshot().await;
    Json(GraphState::clone(&snapshot))
}

/// Re-run the layout and return the repositioned graph
pub async fn relayout(
    State(state): State<AppState>,
    Json(request): Json<LayoutRequest>,
) -> Result<Json<GraphState>> {
    let snapshot = state.controller.relayout(request.direction).await?;
    Ok(Json(GraphState::clone(&snapshot)))
}
