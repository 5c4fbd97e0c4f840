//! Atomic concepts derived from a paper

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    /// Parse a model-provided tag; anything unrecognized is `None`
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Id as returned by the model, e.g. `concept-1`
    pub id: String,
    pub name: String,
    pub summary: String,
    pub importance: Importance,
}

impl Concept {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        summary: impl Into<String>,
        importance: Importance,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            summary: summary.into(),
            importance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_parse() {
        assert_eq!(Importance::parse_loose(" HIGH "), Some(Importance::High));
        assert_eq!(Importance::parse_loose("low"), Some(Importance::Low));
        assert_eq!(Importance::parse_loose("critical"), None);
        assert_eq!(Importance::default(), Importance::Medium);
    }

    #[test]
    fn test_importance_serde() {
        let json = serde_json::to_string(&Importance::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
