//! Graph state
//!
//! `GraphState` is an immutable value. Every mutation returns a new state and
//! leaves the receiver untouched, so a published snapshot can be read
//! without locking while the next one is being computed.
//!
//! Identity rules:
//! - papers: `paper-<bibId>`, else `paper-<timestamp millis>`
//! - concepts: `concept-<paperNode>-<conceptId>`
//! - citations: `citation-<bibId>-<index>`
//! - related edges: `edge-<source>-<target>`

use crate::types::{CitationNode, ConceptNode, EdgeKind, GraphEdge, GraphNode, NodeData, Position};
use papergraph_common::config::ExpansionPolicy;
use papergraph_common::errors::{AppError, Result};
use papergraph_common::models::{Concept, Paper, Relationship};
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

/// Hard cap on citation nodes per expansion
pub const MAX_CITATION_NODES: usize = 10;

/// Distance of concept nodes from their paper before layout
pub const CONCEPT_RADIUS: f64 = 300.0;

/// Characters of the relationship summary shown on an edge
pub const LABEL_CHARS: usize = 50;

/// Node and edge ids produced by one expansion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionIds {
    pub concept_node_ids: Vec<String>,
    pub citation_node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
    /// Node ids dropped under the replace policy
    pub removed_node_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphState {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    /// Expansions applied per paper node
    #[serde(skip)]
    expansions: HashMap<String, u32>,
}

fn random_position() -> Position {
    let mut rng = rand::thread_rng();
    Position::new(rng.gen_range(100.0..500.0), rng.gen_range(100.0..500.0))
}

/// `base`, or `base-<n>` for the smallest n >= 1 not in `taken`
fn unique_id(base: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn edge_label(summary: &str) -> String {
    let head: String = summary.chars().take(LABEL_CHARS).collect();
    format!("{}...", head)
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Paper payload of a full paper node. Citation stubs are rejected.
    pub fn paper(&self, node_id: &str) -> Result<&Paper> {
        let node = self.node(node_id).ok_or_else(|| AppError::NodeNotFound {
            id: node_id.to_string(),
        })?;
        match &node.data {
            NodeData::Paper(paper) => Ok(paper),
            _ => Err(AppError::validation(
                "node_id",
                format!("Node {} is a {}, not a paper", node_id, node.kind()),
            )),
        }
    }

    /// Existing edge of `kind` between `a` and `b`, in either direction
    pub fn find_edge_between(&self, a: &str, b: &str, kind: EdgeKind) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.kind == kind && e.connects(a, b))
    }

    /// Number of expansions applied to a paper node
    pub fn expansion_count(&self, node_id: &str) -> u32 {
        self.expansions.get(node_id).copied().unwrap_or(0)
    }

    fn node_ids(&self) -> HashSet<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut GraphNode> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NodeNotFound { id: id.to_string() })
    }

    fn edge_mut(&mut self, id: &str) -> Result<&mut GraphEdge> {
        self.edges
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::EdgeNotFound { id: id.to_string() })
    }

    /// Add a paper node at a random position. Returns the new state and the
    /// node id.
    pub fn add_paper(&self, paper: Paper) -> Result<(GraphState, String)> {
        self.add_paper_at(paper, chrono::Utc::now().timestamp_millis(), random_position())
    }

    /// Add a paper node with an explicit clock reading and position
    pub fn add_paper_at(&self, paper: Paper, now_millis: i64, position: Position) -> Result<(GraphState, String)> {
        if paper.title.trim().is_empty() {
            return Err(AppError::validation("title", "Paper title is required"));
        }

        if let Some(bib_id) = paper.paper_id.as_deref() {
            let duplicate = self
                .nodes
                .iter()
                .filter_map(GraphNode::paper)
                .any(|p| !p.is_ghost && p.paper_id.as_deref() == Some(bib_id));
            if duplicate {
                return Err(AppError::DuplicatePaper {
                    id: bib_id.to_string(),
                });
            }
        }

        let base = match paper.paper_id.as_deref() {
            Some(bib_id) => format!("paper-{}", bib_id),
            None => format!("paper-{}", now_millis),
        };
        let id = unique_id(base, &self.node_ids());

        let mut next = self.clone();
        next.nodes.push(GraphNode {
            id: id.clone(),
            position,
            data: NodeData::Paper(paper),
        });

        Ok((next, id))
    }

    /// Attach concept and citation nodes to a paper node.
    ///
    /// Under `Append` the n-th repeat expansion namespaces its ids with
    /// `-r<n>`; under `Replace` the previous cluster is removed first.
    pub fn apply_expansion(
        &self,
        paper_node_id: &str,
        concepts: &[Concept],
        citations: &[Paper],
        policy: ExpansionPolicy,
    ) -> Result<(GraphState, ExpansionIds)> {
        let parent = self.node(paper_node_id).ok_or_else(|| AppError::NodeNotFound {
            id: paper_node_id.to_string(),
        })?;
        let NodeData::Paper(paper) = &parent.data else {
            return Err(AppError::validation(
                "node_id",
                format!("Only paper nodes can be expanded, {} is a {}", paper_node_id, parent.kind()),
            ));
        };
        let origin = parent.position;
        let bib_id = paper.paper_id.clone();

        let mut next = self.clone();
        let mut ids = ExpansionIds::default();

        let round = match policy {
            ExpansionPolicy::Append => self.expansion_count(paper_node_id),
            ExpansionPolicy::Replace => {
                ids.removed_node_ids = next.remove_cluster(paper_node_id);
                0
            }
        };
        let namespace = |base: &str| {
            if round == 0 {
                base.to_string()
            } else {
                format!("{}-r{}", base, round)
            }
        };

        let mut taken = next.node_ids();
        let mut taken_edges: HashSet<String> = next.edges.iter().map(|e| e.id.clone()).collect();
        let mut seen_concepts = HashSet::new();
        let concept_ns = namespace(paper_node_id);
        let count = concepts.len().max(1) as f64;

        for (i, concept) in concepts.iter().enumerate() {
            // Same id twice in one reply
            let concept_id = if seen_concepts.insert(concept.id.clone()) {
                concept.id.clone()
            } else {
                format!("{}-{}", concept.id, i + 1)
            };
            seen_concepts.insert(concept_id.clone());

            let node_id = unique_id(format!("concept-{}-{}", concept_ns, concept_id), &taken);
            taken.insert(node_id.clone());

            let angle = 2.0 * PI * i as f64 / count;
            next.nodes.push(GraphNode {
                id: node_id.clone(),
                position: Position::new(
                    origin.x + CONCEPT_RADIUS * angle.cos(),
                    origin.y + CONCEPT_RADIUS * angle.sin(),
                ),
                data: NodeData::Concept(ConceptNode {
                    parent_id: paper_node_id.to_string(),
                    concept: Concept {
                        id: concept_id.clone(),
                        ..concept.clone()
                    },
                }),
            });

            let edge_id = unique_id(format!("edge-{}-concept-{}", concept_ns, concept_id), &taken_edges);
            taken_edges.insert(edge_id.clone());
            next.edges
                .push(GraphEdge::new(edge_id.clone(), paper_node_id, node_id.clone(), EdgeKind::Contains));

            ids.concept_node_ids.push(node_id);
            ids.edge_ids.push(edge_id);
        }

        // Citation ids are keyed by the bibliographic id
        if let Some(bib_id) = bib_id {
            let citation_ns = namespace(&bib_id);

            for (i, ghost) in citations.iter().take(MAX_CITATION_NODES).enumerate() {
                let node_id = unique_id(format!("citation-{}-{}", citation_ns, i), &taken);
                taken.insert(node_id.clone());

                next.nodes.push(GraphNode {
                    id: node_id.clone(),
                    position: origin,
                    data: NodeData::Citation(CitationNode {
                        parent_id: paper_node_id.to_string(),
                        paper: Paper {
                            is_ghost: true,
                            ..ghost.clone()
                        },
                    }),
                });

                let edge_id = unique_id(format!("edge-citation-{}-{}", citation_ns, i), &taken_edges);
                taken_edges.insert(edge_id.clone());
                next.edges
                    .push(GraphEdge::new(edge_id.clone(), paper_node_id, node_id.clone(), EdgeKind::Cites));

                ids.citation_node_ids.push(node_id);
                ids.edge_ids.push(edge_id);
            }
        }

        *next.expansions.entry(paper_node_id.to_string()).or_insert(0) += 1;

        Ok((next, ids))
    }

    /// Remove every node derived from `paper_node_id` and the edges that
    /// touch them. Returns the removed node ids.
    fn remove_cluster(&mut self, paper_node_id: &str) -> Vec<String> {
        let removed: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.parent_id() == Some(paper_node_id))
            .map(|n| n.id.clone())
            .collect();
        let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();

        self.nodes.retain(|n| !removed_set.contains(n.id.as_str()));
        self.edges.retain(|e| {
            !removed_set.contains(e.source.as_str()) && !removed_set.contains(e.target.as_str())
        });

        removed
    }

    /// Find or create an edge of `kind` between two existing nodes.
    /// Returns the new state, the edge id and whether it was created.
    pub fn upsert_edge(&self, source: &str, target: &str, kind: EdgeKind) -> Result<(GraphState, String, bool)> {
        if source == target {
            return Err(AppError::validation("target", "An edge needs two distinct nodes"));
        }
        for id in [source, target] {
            let node = self
                .node(id)
                .ok_or_else(|| AppError::NodeNotFound { id: id.to_string() })?;
            if kind == EdgeKind::Related && !node.is_paper() {
                return Err(AppError::validation(
                    "node_id",
                    format!("Relationships link papers, {} is a {}", id, node.kind()),
                ));
            }
        }

        if let Some(existing) = self.find_edge_between(source, target, kind) {
            return Ok((self.clone(), existing.id.clone(), false));
        }

        let taken: HashSet<String> = self.edges.iter().map(|e| e.id.clone()).collect();
        let id = unique_id(format!("edge-{}-{}", source, target), &taken);

        let mut next = self.clone();
        next.edges.push(GraphEdge::new(id.clone(), source, target, kind));
        Ok((next, id, true))
    }

    /// Set or clear the in-progress flag of an edge
    pub fn mark_analyzing(&self, edge_id: &str, analyzing: bool) -> Result<GraphState> {
        let mut next = self.clone();
        next.edge_mut(edge_id)?.analyzing = analyzing;
        Ok(next)
    }

    /// Store a relationship on a `related` edge, overwriting any earlier one
    pub fn record_relationship(&self, edge_id: &str, relationship: Relationship) -> Result<GraphState> {
        let mut next = self.clone();
        let edge = next.edge_mut(edge_id)?;
        if edge.kind != EdgeKind::Related {
            return Err(AppError::validation(
                "edge_id",
                format!("Only related edges carry a relationship, {} is a {} edge", edge_id, edge.kind.as_str()),
            ));
        }
        edge.label = Some(edge_label(&relationship.summary));
        edge.relationship = Some(relationship);
        edge.analyzing = false;
        Ok(next)
    }

    /// Replace the summary of a paper or citation node
    pub fn enrich_summary(&self, node_id: &str, summary: &str) -> Result<GraphState> {
        if summary.trim().is_empty() {
            return Err(AppError::validation("summary", "Summary must not be empty"));
        }

        let mut next = self.clone();
        let node = next.node_mut(node_id)?;
        match &mut node.data {
            NodeData::Paper(paper) => *paper = paper.with_summary(summary),
            NodeData::Citation(citation) => citation.paper = citation.paper.with_summary(summary),
            NodeData::Concept(_) => {
                return Err(AppError::validation(
                    "node_id",
                    format!("Node {} is a concept", node_id),
                ))
            }
        }
        Ok(next)
    }

    /// Apply positions from a layout pass; nodes missing from `positioned`
    /// keep theirs.
    pub fn with_positions(&self, positioned: &[GraphNode]) -> GraphState {
        let positions: HashMap<&str, Position> = positioned
            .iter()
            .map(|n| (n.id.as_str(), n.position))
            .collect();

        let mut next = self.clone();
        for node in &mut next.nodes {
            if let Some(position) = positions.get(node.id.as_str()) {
                node.position = *position;
            }
        }
        next
    }
}
