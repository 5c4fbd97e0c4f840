//! Relationship handlers

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::AppState;
use papergraph_common::errors::{AppError, Result};
use papergraph_graph::RelationshipOutcome;

/// Connect two paper nodes. `source` is treated as Paper A.
#[derive(Debug, Deserialize)]
pub struct RelationshipRequest {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

/// Create (or reuse) the edge between two papers and classify it
pub async fn create_relationship(
    State(state): State<AppState>,
    Json(request): Json<RelationshipRequest>,
) -> Result<Json<RelationshipOutcome>> {
    for (field, value) in [("source", &request.source), ("target", &request.target)] {
        if value.trim().is_empty() {
            return Err(AppError::MissingField {
                field: field.to_string(),
            });
        }
    }

    let outcome = state
        .controller
        .analyze_relationship(&request.source, &request.target)
        .await?;
    Ok(Json(outcome))
}
