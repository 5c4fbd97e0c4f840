//! Bibliographic search collaborator
//!
//! Looks papers up by free text and lists the works a paper references.
//! The default implementation talks to the Semantic Scholar Graph API.

use crate::config::ScholarConfig;
use crate::errors::{AppError, Result};
use crate::models::Paper;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SEARCH_FIELDS: &str = "title,authors,year,venue,citationCount,referenceCount";
const REFERENCE_FIELDS: &str = "title,authors,year,venue,citationCount";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarAuthor {
    #[serde(default)]
    pub name: String,
}

/// A paper record as returned by the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarPaper {
    #[serde(default)]
    pub paper_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<ScholarAuthor>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub reference_count: Option<u64>,
}

impl ScholarPaper {
    pub fn author_names(&self) -> Vec<String> {
        self.authors
            .iter()
            .map(|a| a.name.clone())
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Citation stub for the `index`-th entry of a reference list
    pub fn to_ghost(&self, index: usize) -> Paper {
        Paper::ghost(
            self.title.clone(),
            self.author_names(),
            self.year,
            self.venue.clone(),
            index,
        )
    }
}

/// Trait for bibliographic lookups
#[async_trait]
pub trait BibliographySource: Send + Sync {
    /// Best match for a free-text query
    async fn search_paper(&self, query: &str) -> Result<Option<ScholarPaper>>;

    /// Works referenced by `paper_id`
    async fn references(&self, paper_id: &str, limit: usize) -> Result<Vec<ScholarPaper>>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ScholarPaper>,
}

#[derive(Deserialize)]
struct ReferenceResponse {
    #[serde(default)]
    data: Vec<ReferenceEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceEntry {
    #[serde(default)]
    cited_paper: Option<ScholarPaper>,
}

/// Semantic Scholar Graph API client
pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(config: &ScholarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| AppError::Bibliography {
            message: format!("Request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Bibliography {
                message: format!("API error {}: {}", status, body),
            });
        }

        response.json().await.map_err(|e| AppError::Bibliography {
            message: format!("Failed to parse response: {}", e),
        })
    }
}

#[async_trait]
impl BibliographySource for SemanticScholarClient {
    async fn search_paper(&self, query: &str) -> Result<Option<ScholarPaper>> {
        let response: SearchResponse = self
            .get(
                "/paper/search",
                &[
                    ("query", query.to_string()),
                    ("limit", "1".to_string()),
                    ("fields", SEARCH_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(response.data.into_iter().next())
    }

    async fn references(&self, paper_id: &str, limit: usize) -> Result<Vec<ScholarPaper>> {
        let response: ReferenceResponse = self
            .get(
                &format!("/paper/{}/references", paper_id),
                &[
                    ("limit", limit.to_string()),
                    ("fields", REFERENCE_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(response
            .data
            .into_iter()
            .filter_map(|entry| entry.cited_paper)
            .collect())
    }
}

/// Source that knows no papers; used when lookups are disabled
pub struct NoBibliography;

#[async_trait]
impl BibliographySource for NoBibliography {
    async fn search_paper(&self, _query: &str) -> Result<Option<ScholarPaper>> {
        Ok(None)
    }

    async fn references(&self, _paper_id: &str, _limit: usize) -> Result<Vec<ScholarPaper>> {
        Ok(Vec::new())
    }
}
