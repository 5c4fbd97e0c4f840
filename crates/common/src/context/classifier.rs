//! Relationship Classifier - Types the relationship between two papers
//!
//! Takes two papers plus assembled evidence and asks the language model to
//! place the pair in the fixed relation taxonomy. Any failure (transport,
//! malformed reply, missing fields) degrades to a deterministic fallback so
//! callers always get a relationship back.

use super::citation_chunker::{CitationChunker, ChunkerConfig};
use super::evidence::{combine_chunks_for_analysis, summary_evidence, DEFAULT_MAX_CONTEXT_LENGTH};
use crate::config::AnalysisConfig;
use crate::llm::{parse_json_reply, ChatRequest, LanguageModel, ReplyError};
use crate::metrics;
use crate::models::relationship::{clamp_confidence, DEFAULT_CONFIDENCE, SUMMARY_UNAVAILABLE};
use crate::models::{Paper, RelationType, Relationship};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const OPERATION: &str = "relationship";

/// Default sampling temperature; low for consistent labels
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const NO_CONTEXT: &str = "No specific citation context available. Use the summaries above.";

/// Result of a full analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipAnalysis {
    pub relationship: Relationship,

    /// Citation chunks that fed the evidence block
    pub citation_chunks_found: usize,

    /// True when the fallback relationship was substituted
    pub used_fallback: bool,
}

/// Wire shape of the classifier reply. Fields stay untyped so a bad value
/// in one field does not discard the others.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipReply {
    #[serde(default)]
    relation_type: Option<Value>,
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    confidence_score: Option<Value>,
}

/// System instruction listing the taxonomy
pub fn system_prompt() -> String {
    let types = RelationType::ALL
        .iter()
        .enumerate()
        .map(|(i, rt)| format!("{}. \"{}\" - {}", i + 1, rt.as_str(), rt.description()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You analyze how two academic papers relate and classify the relationship.\n\n\
         RELATIONSHIP TYPES:\n{}\n\n\
         Respond with a single JSON object and nothing else.",
        types
    )
}

fn user_prompt(paper_a: &Paper, paper_b: &Paper, evidence: &str) -> String {
    let evidence = if evidence.trim().is_empty() {
        NO_CONTEXT
    } else {
        evidence
    };

    format!(
        "Classify the relationship between these papers.\n\n\
         PAPER A:\nTitle: {}\nSummary: {}\n\n\
         PAPER B:\nTitle: {}\nSummary: {}\n\n\
         CITATION CONTEXT (where Paper B mentions Paper A):\n{}\n\n\
         Provide:\n\
         1. relationType: one of the types listed in the instructions\n\
         2. summary: two sentences on how the papers relate\n\
         3. confidenceScore: a number from 0.0 to 1.0\n\n\
         Reply in this shape:\n\
         {{\"relationType\": \"Incremental\", \"summary\": \"...\", \"confidenceScore\": 0.9}}",
        paper_a.title, paper_a.summary, paper_b.title, paper_b.summary, evidence
    )
}

/// Parse a classifier reply into a relationship.
///
/// Only a reply that is not a JSON object is an error. Within an object,
/// an unknown type becomes `Background Reference`, a missing summary gets a
/// placeholder, and a missing or non-numeric confidence becomes 0.5.
pub fn parse_relationship_reply(raw: &str) -> Result<Relationship, ReplyError> {
    let value: Value = parse_json_reply(raw)?;
    if !value.is_object() {
        return Err(ReplyError::Schema("expected a JSON object".to_string()));
    }
    let reply: RelationshipReply = serde_json::from_value(value)?;

    let relation_type = reply
        .relation_type
        .as_ref()
        .and_then(Value::as_str)
        .and_then(RelationType::parse_loose)
        .unwrap_or_default();

    let summary = reply
        .summary
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(SUMMARY_UNAVAILABLE);

    let confidence = reply
        .confidence_score
        .as_ref()
        .and_then(Value::as_f64)
        .map(clamp_confidence)
        .unwrap_or(DEFAULT_CONFIDENCE);

    Ok(Relationship::new(relation_type, summary, confidence))
}

/// Classifier over a language model
#[derive(Clone)]
pub struct RelationshipClassifier {
    llm: Arc<dyn LanguageModel>,
    temperature: f32,
    chunker: CitationChunker,
    max_context_length: usize,
}

impl RelationshipClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            temperature: DEFAULT_TEMPERATURE,
            chunker: CitationChunker::default(),
            max_context_length: DEFAULT_MAX_CONTEXT_LENGTH,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Apply evidence limits from configuration
    pub fn with_analysis_config(mut self, config: &AnalysisConfig) -> Self {
        self.chunker = CitationChunker::new(ChunkerConfig {
            max_chunks: config.max_chunks,
            ..ChunkerConfig::default()
        });
        self.max_context_length = config.max_context_length;
        self
    }

    /// Classify the relationship of `paper_b` to `paper_a` given `evidence`.
    ///
    /// Never fails: errors yield [`Relationship::fallback`].
    pub async fn classify(&self, paper_a: &Paper, paper_b: &Paper, evidence: &str) -> Relationship {
        self.classify_inner(paper_a, paper_b, evidence).await.0
    }

    /// Full pipeline: find where `paper_b` discusses `paper_a`, assemble the
    /// evidence, classify.
    pub async fn analyze(&self, paper_a: &Paper, paper_b: &Paper) -> RelationshipAnalysis {
        let chunks = self
            .chunker
            .extract(paper_b.analysis_text(), &paper_a.title, &paper_a.authors);

        let evidence = if chunks.is_empty() {
            summary_evidence(paper_a, paper_b)
        } else {
            combine_chunks_for_analysis(&chunks, self.max_context_length)
        };

        debug!(
            paper_a = %paper_a.title,
            paper_b = %paper_b.title,
            chunks = chunks.len(),
            evidence_len = evidence.len(),
            "Evidence assembled"
        );

        let (relationship, used_fallback) = self.classify_inner(paper_a, paper_b, &evidence).await;

        RelationshipAnalysis {
            relationship,
            citation_chunks_found: chunks.len(),
            used_fallback,
        }
    }

    async fn classify_inner(&self, paper_a: &Paper, paper_b: &Paper, evidence: &str) -> (Relationship, bool) {
        let request = ChatRequest::new(
            OPERATION,
            system_prompt(),
            user_prompt(paper_a, paper_b, evidence),
        )
        .temperature(self.temperature)
        .json();

        let reply = match self.llm.complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Relationship classification failed, using fallback");
                metrics::record_fallback(OPERATION);
                return (Relationship::fallback(), true);
            }
        };

        match parse_relationship_reply(&reply) {
            Ok(relationship) => {
                info!(
                    relation_type = %relationship.relation_type,
                    confidence = relationship.confidence_score,
                    "Relationship classified"
                );
                (relationship, false)
            }
            Err(e) => {
                warn!(error = %e, reply_len = reply.len(), "Unparseable classifier reply, using fallback");
                metrics::record_fallback(OPERATION);
                (Relationship::fallback(), true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLanguageModel;
    use crate::models::relationship::{ANALYSIS_UNAVAILABLE, FALLBACK_CONFIDENCE};

    fn papers() -> (Paper, Paper) {
        let mut a = Paper::new("Graph Coloring Algorithms", "Greedy coloring bounds.");
        a.authors = vec!["Jane Smith".into()];
        let mut b = Paper::new("Scheduling via Coloring", "Applies coloring to scheduling.");
        b.full_text = Some(
            "We study exam scheduling in universities. \
             This work extends the method of Smith et al. (2020) on graph coloring. \
             Experiments follow in the next section."
                .into(),
        );
        (a, b)
    }

    #[test]
    fn test_system_prompt_lists_taxonomy() {
        let prompt = system_prompt();
        for rt in RelationType::ALL {
            assert!(prompt.contains(rt.as_str()));
        }
    }

    #[test]
    fn test_parse_valid_reply() {
        let rel = parse_relationship_reply(
            r#"{"relationType":"Applied","summary":"B applies A.","confidenceScore":0.81}"#,
        )
        .unwrap();
        assert_eq!(rel.relation_type, RelationType::Applied);
        assert_eq!(rel.summary, "B applies A.");
        assert_eq!(rel.confidence_score, 0.81);
    }

    #[test]
    fn test_parse_clamps_confidence() {
        let high = parse_relationship_reply(r#"{"relationType":"Incremental","summary":"s","confidenceScore":99}"#).unwrap();
        assert_eq!(high.confidence_score, 1.0);
        let low = parse_relationship_reply(r#"{"relationType":"Incremental","summary":"s","confidenceScore":-5}"#).unwrap();
        assert_eq!(low.confidence_score, 0.0);
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let rel = parse_relationship_reply(r#"{"relationType":"Sideways","confidenceScore":"high"}"#).unwrap();
        assert_eq!(rel.relation_type, RelationType::BackgroundReference);
        assert_eq!(rel.summary, SUMMARY_UNAVAILABLE);
        assert_eq!(rel.confidence_score, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let raw = "```json\n{\"relationType\":\"comparative analysis\",\"summary\":\"x\",\"confidenceScore\":0.4}\n```";
        let rel = parse_relationship_reply(raw).unwrap();
        assert_eq!(rel.relation_type, RelationType::ComparativeAnalysis);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_relationship_reply("not json at all").is_err());
        assert!(parse_relationship_reply("[1, 2, 3]").is_err());
        assert!(parse_relationship_reply("").is_err());
    }

    #[tokio::test]
    async fn test_classify_valid_reply() {
        let llm = Arc::new(MockLanguageModel::replying(
            r#"{"relationType":"Methodological Improvement","summary":"B refines A.","confidenceScore":0.7}"#,
        ));
        let classifier = RelationshipClassifier::new(llm.clone());
        let (a, b) = papers();

        let rel = classifier.classify(&a, &b, "some evidence").await;

        assert_eq!(rel.relation_type, RelationType::MethodologicalImprovement);
        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_mode);
        assert_eq!(requests[0].temperature, DEFAULT_TEMPERATURE);
        assert!(requests[0].user_prompt.contains("some evidence"));
    }

    #[tokio::test]
    async fn test_fenced_reply_over_summaries_only() {
        let llm = Arc::new(MockLanguageModel::replying(
            "```json\n{\"relationType\":\"Applied\",\"summary\":\"B applies A to timetabling.\",\"confidenceScore\":1.4}\n```",
        ));
        let classifier = RelationshipClassifier::new(llm.clone());
        let a = Paper::new("Graph Coloring Algorithms", "Greedy bounds for coloring.");
        let b = Paper::new("Exam Timetabling", "Assigns exam slots to rooms.");

        let analysis = classifier.analyze(&a, &b).await;

        assert_eq!(analysis.citation_chunks_found, 0);
        assert_eq!(analysis.relationship.relation_type, RelationType::Applied);
        assert_eq!(analysis.relationship.confidence_score, 1.0);
        assert!(llm.requests()[0].user_prompt.contains(&summary_evidence(&a, &b)));
    }

    #[tokio::test]
    async fn test_classify_transport_failure_falls_back() {
        let classifier = RelationshipClassifier::new(Arc::new(MockLanguageModel::failing("connection refused")));
        let (a, b) = papers();

        let rel = classifier.classify(&a, &b, "").await;

        assert_eq!(rel.relation_type, RelationType::BackgroundReference);
        assert_eq!(rel.confidence_score, FALLBACK_CONFIDENCE);
        assert_eq!(rel.summary, ANALYSIS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_classify_malformed_reply_falls_back() {
        let classifier = RelationshipClassifier::new(Arc::new(MockLanguageModel::replying("I think they are related.")));
        let (a, b) = papers();

        assert_eq!(classifier.classify(&a, &b, "").await, Relationship::fallback());
    }

    #[tokio::test]
    async fn test_empty_evidence_uses_placeholder() {
        let llm = Arc::new(MockLanguageModel::replying("{}"));
        let classifier = RelationshipClassifier::new(llm.clone());
        let (a, b) = papers();

        let rel = classifier.classify(&a, &b, "   ").await;

        assert_eq!(rel.relation_type, RelationType::BackgroundReference);
        assert_eq!(rel.confidence_score, DEFAULT_CONFIDENCE);
        assert!(llm.requests()[0].user_prompt.contains(NO_CONTEXT));
    }

    #[tokio::test]
    async fn test_analyze_uses_citation_evidence() {
        let llm = Arc::new(MockLanguageModel::replying(
            r#"{"relationType":"Incremental","summary":"B extends A.","confidenceScore":0.9}"#,
        ));
        let classifier = RelationshipClassifier::new(llm.clone());
        let (a, b) = papers();

        let analysis = classifier.analyze(&a, &b).await;

        assert!(analysis.citation_chunks_found >= 1);
        assert!(!analysis.used_fallback);
        assert_eq!(analysis.relationship.relation_type, RelationType::Incremental);
        assert!(llm.requests()[0]
            .user_prompt
            .contains("extends the method of Smith"));
    }

    #[tokio::test]
    async fn test_analyze_without_chunks_uses_summaries() {
        let llm = Arc::new(MockLanguageModel::failing("down"));
        let classifier = RelationshipClassifier::new(llm.clone());
        let a = Paper::new("Quantum Error Correction", "Surface codes.");
        let b = Paper::new("Protein Folding", "Deep learning for structures.");

        let analysis = classifier.analyze(&a, &b).await;

        assert_eq!(analysis.citation_chunks_found, 0);
        assert!(analysis.used_fallback);
        assert_eq!(analysis.relationship, Relationship::fallback());
        assert!(llm.requests()[0]
            .user_prompt
            .contains("Paper A Summary: Surface codes.\n\nPaper B Summary: Deep learning for structures."));
    }
}
