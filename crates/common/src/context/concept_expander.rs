//! Concept Expander - Decomposes a paper into atomic concepts
//!
//! Asks the language model for a handful of named concepts with a short
//! explanation and an importance tag. When the model is unreachable or its
//! reply is unusable, a fixed generic set is returned instead.

use crate::errors::{AppError, Result};
use crate::llm::{parse_json_reply, ChatRequest, LanguageModel, ReplyError};
use crate::metrics;
use crate::models::{Concept, Importance};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const OPERATION: &str = "concepts";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = "You break research papers down into atomic concepts for computer science students. \
Respond with a single JSON object and nothing else.";

/// Concepts produced for one paper
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptExpansion {
    pub concepts: Vec<Concept>,

    /// True when the fixed fallback set was substituted
    pub used_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct ConceptsReply {
    concepts: Vec<RawConcept>,
}

#[derive(Debug, Deserialize)]
struct RawConcept {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    importance: Option<String>,
}

impl RawConcept {
    fn normalize(self, index: usize) -> Concept {
        let id = match self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => format!("concept-{}", n),
            _ => format!("concept-{}", index + 1),
        };
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Concept {}", index + 1));
        let importance = self
            .importance
            .as_deref()
            .and_then(Importance::parse_loose)
            .unwrap_or_default();

        Concept::new(id, name, self.summary.unwrap_or_default(), importance)
    }
}

/// Generic concept set used when extraction fails
pub fn fallback_concepts() -> Vec<Concept> {
    [
        (
            "Core Algorithm",
            "The main computational approach used to solve the problem",
            Importance::High,
        ),
        (
            "Data Structure",
            "The way data is organized and accessed in the system",
            Importance::High,
        ),
        (
            "Optimization Technique",
            "Methods used to improve performance or efficiency",
            Importance::Medium,
        ),
        (
            "Evaluation Metric",
            "How the approach is measured and validated",
            Importance::Medium,
        ),
        (
            "Baseline Comparison",
            "Comparison with existing approaches in the field",
            Importance::Low,
        ),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, summary, importance))| {
        Concept::new(format!("concept-{}", i + 1), name, summary, importance)
    })
    .collect()
}

/// Parse an extraction reply. The object must carry a non-empty
/// `concepts` list; missing per-concept fields are filled in.
pub fn parse_concepts_reply(raw: &str) -> std::result::Result<Vec<Concept>, ReplyError> {
    let reply: ConceptsReply = parse_json_reply(raw)?;
    if reply.concepts.is_empty() {
        return Err(ReplyError::Schema("concepts list is empty".to_string()));
    }

    Ok(reply
        .concepts
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.normalize(i))
        .collect())
}

fn user_prompt(title: &str, summary: &str) -> String {
    format!(
        "Extract 5 to 8 key atomic concepts from the paper below. For each concept give:\n\
         - id: a short identifier such as \"concept-1\"\n\
         - name: 2 to 5 words\n\
         - summary: 1 to 2 sentences a student can follow\n\
         - importance: \"high\", \"medium\" or \"low\"\n\n\
         Paper Title: {}\n\
         Paper Summary: {}\n\n\
         Reply in this shape:\n\
         {{\"concepts\": [{{\"id\": \"concept-1\", \"name\": \"...\", \"summary\": \"...\", \"importance\": \"high\"}}]}}",
        title, summary
    )
}

/// Concept extraction over a language model
#[derive(Clone)]
pub struct ConceptExpander {
    llm: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl ConceptExpander {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Extract concepts for a paper.
    ///
    /// Fails only on empty input; model failures yield the fallback set.
    pub async fn expand(&self, title: &str, summary: &str) -> Result<ConceptExpansion> {
        if title.trim().is_empty() {
            return Err(AppError::validation("title", "Paper title is required"));
        }
        if summary.trim().is_empty() {
            return Err(AppError::validation("summary", "Paper summary is required"));
        }

        let request = ChatRequest::new(OPERATION, SYSTEM_PROMPT, user_prompt(title, summary))
            .temperature(self.temperature)
            .json();

        let reply = match self.llm.complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, title, "Concept extraction failed, using fallback concepts");
                return Ok(Self::fallback());
            }
        };

        match parse_concepts_reply(&reply) {
            Ok(concepts) => {
                info!(title, concepts = concepts.len(), "Concepts extracted");
                Ok(ConceptExpansion {
                    concepts,
                    used_fallback: false,
                })
            }
            Err(e) => {
                warn!(error = %e, title, "Unparseable concept reply, using fallback concepts");
                Ok(Self::fallback())
            }
        }
    }

    fn fallback() -> ConceptExpansion {
        metrics::record_fallback(OPERATION);
        ConceptExpansion {
            concepts: fallback_concepts(),
            used_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLanguageModel;

    #[test]
    fn test_fallback_set() {
        let concepts = fallback_concepts();
        assert_eq!(concepts.len(), 5);
        assert_eq!(concepts[0].name, "Core Algorithm");
        assert_eq!(concepts[0].importance, Importance::High);
        assert_eq!(concepts[4].name, "Baseline Comparison");
        assert_eq!(concepts[4].importance, Importance::Low);
        assert_eq!(concepts[2].id, "concept-3");
    }

    #[test]
    fn test_parse_fills_defaults() {
        let concepts = parse_concepts_reply(
            r#"{"concepts":[
                {"id":"c-a","name":"Greedy Coloring","summary":"Colors vertices in order.","importance":"HIGH"},
                {"summary":"No name here.","importance":"critical"},
                {"id":7,"name":"  "}
            ]}"#,
        )
        .unwrap();

        assert_eq!(concepts.len(), 3);
        assert_eq!(concepts[0].id, "c-a");
        assert_eq!(concepts[0].importance, Importance::High);
        assert_eq!(concepts[1].id, "concept-2");
        assert_eq!(concepts[1].name, "Concept 2");
        assert_eq!(concepts[1].importance, Importance::Medium);
        assert_eq!(concepts[2].id, "concept-7");
        assert_eq!(concepts[2].name, "Concept 3");
        assert_eq!(concepts[2].summary, "");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(parse_concepts_reply(r#"{"concepts":[]}"#).is_err());
        assert!(parse_concepts_reply(r#"{"ideas":[{"name":"x"}]}"#).is_err());
        assert!(parse_concepts_reply("here are some concepts").is_err());
    }

    #[tokio::test]
    async fn test_expand_success() {
        let llm = Arc::new(MockLanguageModel::replying(
            "```json\n{\"concepts\":[{\"id\":\"concept-1\",\"name\":\"Self Attention\",\"summary\":\"Tokens attend to each other.\",\"importance\":\"high\"}]}\n```",
        ));
        let expander = ConceptExpander::new(llm.clone());

        let expansion = expander.expand("Attention Is All You Need", "Transformers.").await.unwrap();

        assert!(!expansion.used_fallback);
        assert_eq!(expansion.concepts.len(), 1);
        assert_eq!(expansion.concepts[0].name, "Self Attention");

        let request = &llm.requests()[0];
        assert!(request.json_mode);
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert!(request.user_prompt.contains("Attention Is All You Need"));
    }

    #[tokio::test]
    async fn test_expand_transport_failure_uses_fallback() {
        let expander = ConceptExpander::new(Arc::new(MockLanguageModel::failing("connection refused")));

        let expansion = expander.expand("T", "S").await.unwrap();

        assert!(expansion.used_fallback);
        assert_eq!(expansion.concepts, fallback_concepts());
    }

    #[tokio::test]
    async fn test_expand_malformed_reply_uses_fallback() {
        let expander = ConceptExpander::new(Arc::new(MockLanguageModel::replying("{\"concepts\": 3}")));
        let expansion = expander.expand("T", "S").await.unwrap();
        assert!(expansion.used_fallback);
    }

    #[tokio::test]
    async fn test_expand_rejects_empty_input() {
        let llm = Arc::new(MockLanguageModel::replying("{}"));
        let expander = ConceptExpander::new(llm.clone());

        assert!(matches!(
            expander.expand("  ", "S").await,
            Err(AppError::Validation { .. })
        ));
        assert!(expander.expand("T", "").await.is_err());
        assert!(llm.requests().is_empty());
    }
}
