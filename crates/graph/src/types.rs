//! Node and edge types of the paper graph

use papergraph_common::models::{Concept, Paper, Relationship};
use serde::{Deserialize, Serialize};

/// Top-left corner of a node box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Concept derived from a paper node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNode {
    /// Paper node the concept was extracted from
    pub parent_id: String,
    #[serde(flatten)]
    pub concept: Concept,
}

/// Ghost paper referenced by a paper node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationNode {
    /// Paper node whose reference list produced this stub
    pub parent_id: String,
    #[serde(flatten)]
    pub paper: Paper,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeData {
    Paper(Paper),
    Concept(ConceptNode),
    Citation(CitationNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub position: Position,
    pub data: NodeData,
}

impl GraphNode {
    /// Paper payload of paper and citation nodes
    pub fn paper(&self) -> Option<&Paper> {
        match &self.data {
            NodeData::Paper(paper) => Some(paper),
            NodeData::Citation(citation) => Some(&citation.paper),
            NodeData::Concept(_) => None,
        }
    }

    pub fn is_paper(&self) -> bool {
        matches!(self.data, NodeData::Paper(_))
    }

    /// Paper node this node was derived from, if any
    pub fn parent_id(&self) -> Option<&str> {
        match &self.data {
            NodeData::Paper(_) => None,
            NodeData::Concept(c) => Some(&c.parent_id),
            NodeData::Citation(c) => Some(&c.parent_id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.data {
            NodeData::Paper(_) => "paper",
            NodeData::Concept(_) => "concept",
            NodeData::Citation(_) => "citation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// paper -> citation
    Cites,
    /// paper -> concept
    Contains,
    /// paper <-> paper, may carry a relationship
    Related,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cites => "cites",
            Self::Contains => "contains",
            Self::Related => "related",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,

    /// Short display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Relationship>,

    /// Set while a classification for this edge is running
    #[serde(default)]
    pub analyzing: bool,
}

impl GraphEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            label: None,
            relationship: None,
            analyzing: false,
        }
    }

    /// True if the edge joins `a` and `b` in either direction
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papergraph_common::models::Importance;

    #[test]
    fn test_node_serialization_is_tagged() {
        let node = GraphNode {
            id: "concept-paper-1-concept-1".into(),
            position: Position::new(1.0, 2.0),
            data: NodeData::Concept(ConceptNode {
                parent_id: "paper-1".into(),
                concept: Concept::new("concept-1", "Greedy Coloring", "s", Importance::High),
            }),
        };

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["data"]["type"], "concept");
        assert_eq!(json["data"]["parentId"], "paper-1");
        assert_eq!(json["data"]["importance"], "high");
        assert_eq!(node.parent_id(), Some("paper-1"));
        assert!(node.paper().is_none());
    }

    #[test]
    fn test_edge_connects_either_direction() {
        let edge = GraphEdge::new("e", "a", "b", EdgeKind::Related);
        assert!(edge.connects("a", "b"));
        assert!(edge.connects("b", "a"));
        assert!(!edge.connects("a", "c"));

        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["kind"], "related");
        assert!(json.get("relationship").is_none());
    }
}
