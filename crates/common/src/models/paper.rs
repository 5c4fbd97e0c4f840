//! Paper model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A research paper, or a ghost stub standing in for a cited work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Bibliographic id (e.g. a Semantic Scholar paper id) when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,

    pub title: String,

    /// Abstract or synthesized one-line description
    #[serde(default)]
    pub summary: String,

    /// Author names in publication order
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,

    /// Extracted document text, used as citation evidence source
    #[serde(default, skip_serializing)]
    pub full_text: Option<String>,

    /// True for citation stubs that were never fetched in full
    #[serde(default)]
    pub is_ghost: bool,
}

impl Paper {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            paper_id: None,
            title: title.into(),
            summary: summary.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            full_text: None,
            is_ghost: false,
        }
    }

    /// Build a citation stub for the `index`-th reference of a paper.
    ///
    /// The summary is synthesized from the venue and year since the
    /// referenced work's abstract is not fetched.
    pub fn ghost(
        title: impl Into<String>,
        authors: Vec<String>,
        year: Option<i32>,
        venue: Option<String>,
        index: usize,
    ) -> Self {
        let summary = match venue.as_deref().filter(|v| !v.is_empty()) {
            Some(venue) => match year {
                Some(year) => format!("Published in {} ({})", venue, year),
                None => format!("Published in {}", venue),
            },
            None => format!("Citation {}", index + 1),
        };

        Self {
            paper_id: None,
            title: title.into(),
            summary,
            authors,
            year,
            venue,
            full_text: None,
            is_ghost: true,
        }
    }

    /// Return a copy with an enriched summary; every other field is kept.
    pub fn with_summary(&self, summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..self.clone()
        }
    }

    /// Text searched for citation evidence: the full text when available
    pub fn analysis_text(&self) -> &str {
        match self.full_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.summary,
        }
    }

    /// Comma-separated authors, or "Unknown"
    pub fn authors_display(&self) -> String {
        if self.authors.is_empty() {
            "Unknown".to_string()
        } else {
            self.authors.join(", ")
        }
    }
}

/// Input for adding a paper to the graph
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPaper {
    #[validate(length(max = 200))]
    pub paper_id: Option<String>,

    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 50000))]
    pub summary: String,

    #[serde(default)]
    pub authors: Vec<String>,

    pub year: Option<i32>,

    pub venue: Option<String>,

    pub full_text: Option<String>,
}

impl NewPaper {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            paper_id: None,
            title: title.into(),
            summary: summary.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            full_text: None,
        }
    }

    pub fn into_paper(self) -> Paper {
        Paper {
            paper_id: self.paper_id.filter(|id| !id.trim().is_empty()),
            title: self.title.trim().to_string(),
            summary: self.summary,
            authors: self.authors,
            year: self.year,
            venue: self.venue,
            full_text: self.full_text,
            is_ghost: false,
        }
    }
}
