//! Typed relationships between two papers

use serde::{Deserialize, Serialize};

/// Summary used when the classifier reply carries no summary of its own
pub const SUMMARY_UNAVAILABLE: &str = "Relationship analysis unavailable.";

/// Summary of the deterministic fallback relationship
pub const ANALYSIS_UNAVAILABLE: &str = "Relationship analysis unavailable. Papers may be related but specific connection could not be determined.";

/// Confidence of the deterministic fallback relationship
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Confidence assumed when the classifier omits one
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Fixed relation taxonomy. Paper A is the earlier/cited work, Paper B the
/// one relating to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "Incremental")]
    Incremental,
    #[serde(rename = "Contradictory")]
    Contradictory,
    #[serde(rename = "Applied")]
    Applied,
    #[serde(rename = "Methodological Improvement")]
    MethodologicalImprovement,
    #[serde(rename = "Theoretical Extension")]
    TheoreticalExtension,
    #[serde(rename = "Comparative Analysis")]
    ComparativeAnalysis,
    #[default]
    #[serde(rename = "Background Reference")]
    BackgroundReference,
}

impl RelationType {
    pub const ALL: [RelationType; 7] = [
        RelationType::Incremental,
        RelationType::Contradictory,
        RelationType::Applied,
        RelationType::MethodologicalImprovement,
        RelationType::TheoreticalExtension,
        RelationType::ComparativeAnalysis,
        RelationType::BackgroundReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incremental => "Incremental",
            Self::Contradictory => "Contradictory",
            Self::Applied => "Applied",
            Self::MethodologicalImprovement => "Methodological Improvement",
            Self::TheoreticalExtension => "Theoretical Extension",
            Self::ComparativeAnalysis => "Comparative Analysis",
            Self::BackgroundReference => "Background Reference",
        }
    }

    /// Meaning given to the classifier
    pub fn description(&self) -> &'static str {
        match self {
            Self::Incremental => "Paper B builds upon or extends the work in Paper A",
            Self::Contradictory => "Paper B challenges, refutes, or contradicts findings in Paper A",
            Self::Applied => "Paper B applies methods or concepts from Paper A to a new domain or problem",
            Self::MethodologicalImprovement => "Paper B improves upon the methodology or techniques in Paper A",
            Self::TheoreticalExtension => "Paper B extends the theoretical framework from Paper A",
            Self::ComparativeAnalysis => "Paper B compares its approach with Paper A",
            Self::BackgroundReference => "Paper A is cited as background or related work without direct extension",
        }
    }

    /// Match model output against the taxonomy, ignoring case, spacing and
    /// separators (`methodological_improvement` matches).
    pub fn parse_loose(s: &str) -> Option<Self> {
        let wanted = normalize(s);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|rt| normalize(rt.as_str()) == wanted)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Classified relationship attached to a `related` edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub relation_type: RelationType,
    pub summary: String,
    pub confidence_score: f64,
}

impl Relationship {
    /// Build a relationship, clamping the confidence into [0, 1]
    pub fn new(relation_type: RelationType, summary: impl Into<String>, confidence: f64) -> Self {
        Self {
            relation_type,
            summary: summary.into(),
            confidence_score: clamp_confidence(confidence),
        }
    }

    /// Deterministic result used whenever classification fails
    pub fn fallback() -> Self {
        Self::new(
            RelationType::BackgroundReference,
            ANALYSIS_UNAVAILABLE,
            FALLBACK_CONFIDENCE,
        )
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_CONFIDENCE;
    }
    value.clamp(0.0, 1.0)
}
