//! Paper node handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;
use validator::Validate;

use crate::AppState;
use papergraph_common::{
    errors::Result,
    models::{NewPaper, Paper},
    scholar::ScholarPaper,
};
use papergraph_graph::{ExpansionReport, GraphNode};

/// Request to add a paper node
#[derive(Debug, Deserialize)]
pub struct AddPaperRequest {
    #[serde(flatten)]
    pub paper: NewPaper,

    /// Fill missing authors, year, venue and bibliographic id from a
    /// title search before adding
    #[serde(default)]
    pub lookup: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 500))]
    pub query: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SummaryRequest {
    #[validate(length(min = 1, max = 50000))]
    pub summary: String,
}

/// Add a paper node to the graph
pub async fn add_paper(
    State(state): State<AppState>,
    Json(request): Json<AddPaperRequest>,
) -> Result<(StatusCode, Json<GraphNode>)> {
    request.paper.validate()?;

    let mut paper = request.paper.into_paper();
    if request.lookup {
        fill_metadata(&state, &mut paper).await;
    }

    let node = state.controller.add_paper(paper).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// Missing metadata is optional, so a failed lookup only logs
async fn fill_metadata(state: &AppState, paper: &mut Paper) {
    match state.controller.search_paper(&paper.title).await {
        Ok(found) => {
            if paper.paper_id.is_none() {
                paper.paper_id = found.paper_id.clone();
            }
            if paper.authors.is_empty() {
                paper.authors = found.author_names();
            }
            paper.year = paper.year.or(found.year);
            if paper.venue.is_none() {
                paper.venue = found.venue;
            }
        }
        Err(e) => {
            debug!(error = %e, title = %paper.title, "No bibliographic match, adding without metadata");
        }
    }
}

/// Best bibliographic match for a free-text query
pub async fn search_paper(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<ScholarPaper>> {
    request.validate()?;
    let paper = state.controller.search_paper(&request.query).await?;
    Ok(Json(paper))
}

/// Expand a paper node into concepts and citations
pub async fn expand_paper(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<ExpansionReport>> {
    let report = state.controller.expand_paper(&node_id).await?;
    Ok(Json(report))
}

/// Replace the summary of a paper or citation node
pub async fn update_summary(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<GraphNode>> {
    request.validate()?;
    let node = state.controller.enrich_summary(&node_id, &request.summary).await?;
    Ok(Json(node))
}
