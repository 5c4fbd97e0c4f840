//! Document upload handler

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use papergraph_common::{
    errors::{AppError, Result},
    models::Paper,
};
use papergraph_graph::GraphNode;
use papergraph_ingestion::{extract_document, ExtractedDocument};

/// Header carrying the uploaded file's name
pub const FILE_NAME_HEADER: &str = "x-file-name";

const DEFAULT_FILE_NAME: &str = "document.pdf";

#[derive(Debug, Deserialize)]
pub struct DocumentParams {
    /// Add the extracted paper to the graph
    #[serde(default = "default_add")]
    pub add: bool,
}

fn default_add() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: ExtractedDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<GraphNode>,
}

/// Extract a PDF sent as the raw request body and, unless `add=false`,
/// add it as a paper node whose full text feeds citation evidence
pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<DocumentParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentResponse>)> {
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILE_NAME)
        .to_string();

    if body.is_empty() {
        return Err(AppError::MissingField {
            field: "file".to_string(),
        });
    }

    let name = file_name.clone();
    let document = tokio::task::spawn_blocking(move || extract_document(&body, &name))
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Document extraction task failed: {}", e),
        })??;

    info!(file_name = %file_name, pages = document.num_pages, "Document uploaded");

    if !params.add {
        return Ok((StatusCode::OK, Json(DocumentResponse { document, node: None })));
    }

    let mut paper = Paper::new(document.title.clone(), document.summary.clone());
    paper.full_text = Some(document.full_text.clone());
    let node = state.controller.add_paper(paper).await?;

    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse {
            document,
            node: Some(node),
        }),
    ))
}
