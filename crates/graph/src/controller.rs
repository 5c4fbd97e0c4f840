//! Graph controller
//!
//! Owns the current `GraphState` and runs every user-facing operation
//! against it. Collaborator calls (language model, bibliography) happen
//! without holding the state lock; their results are applied through a
//! fresh read-modify-swap of the state.
//!
//! Expansion and analysis run on their own tokio task. A caller that goes
//! away (client disconnect, request timeout) does not cancel them, so the
//! outcome or its fallback is always published and the in-flight guard is
//! released only once it is.

use crate::guard::{InFlightRegistry, OperationKind};
use crate::layout::{layout, LayoutOptions};
use crate::state::{ExpansionIds, GraphState};
use crate::types::{EdgeKind, GraphEdge, GraphNode, NodeData};
use papergraph_common::config::{AppConfig, ExpansionPolicy, LayoutDirection};
use papergraph_common::context::{ChatMessage, ConceptExpander, RelationshipChat, RelationshipClassifier};
use papergraph_common::errors::{AppError, Result};
use papergraph_common::metrics;
use papergraph_common::models::Paper;
use papergraph_common::scholar::{BibliographySource, ScholarPaper};
use papergraph_common::LanguageModel;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Outcome of expanding a paper node
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionReport {
    pub node_id: String,
    #[serde(flatten)]
    pub ids: ExpansionIds,
    /// True when the fixed concept set was used
    pub used_fallback: bool,
}

/// Outcome of analyzing an edge
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipOutcome {
    pub edge: GraphEdge,
    pub citation_chunks_found: usize,
    pub used_fallback: bool,
}

/// Cloning is cheap and shares the same graph
#[derive(Clone)]
pub struct GraphController {
    state: Arc<RwLock<Arc<GraphState>>>,
    in_flight: InFlightRegistry,
    expander: ConceptExpander,
    classifier: RelationshipClassifier,
    chat: RelationshipChat,
    bibliography: Arc<dyn BibliographySource>,
    policy: ExpansionPolicy,
    layout: LayoutOptions,
    reference_limit: usize,
    max_citation_nodes: usize,
}

impl GraphController {
    pub fn new(
        config: &AppConfig,
        llm: Arc<dyn LanguageModel>,
        bibliography: Arc<dyn BibliographySource>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(Arc::new(GraphState::new()))),
            in_flight: InFlightRegistry::new(),
            expander: ConceptExpander::new(llm.clone()).with_temperature(config.llm.concept_temperature),
            classifier: RelationshipClassifier::new(llm.clone())
                .with_temperature(config.llm.relationship_temperature)
                .with_analysis_config(&config.analysis),
            chat: RelationshipChat::new(llm).with_temperature(config.llm.chat_temperature),
            bibliography,
            policy: config.graph.expansion_policy,
            layout: LayoutOptions::from(&config.graph),
            reference_limit: config.scholar.reference_limit,
            max_citation_nodes: config.scholar.max_citation_nodes,
        }
    }

    /// Current published state
    pub async fn snapshot(&self) -> Arc<GraphState> {
        self.state.read().await.clone()
    }

    /// Compute the next state from the current one and publish it
    async fn update<T>(&self, f: impl FnOnce(&GraphState) -> Result<(GraphState, T)>) -> Result<T> {
        let mut current = self.state.write().await;
        let (next, value) = f(&**current)?;
        metrics::record_graph_size(next.nodes().len(), next.edges().len());
        *current = Arc::new(next);
        Ok(value)
    }

    pub async fn add_paper(&self, paper: Paper) -> Result<GraphNode> {
        let node = self
            .update(|state| {
                let (next, id) = state.add_paper(paper)?;
                let node = next.node(&id).cloned().ok_or_else(|| AppError::Internal {
                    message: format!("Node {} missing after insert", id),
                })?;
                Ok((next, node))
            })
            .await?;

        info!(node_id = %node.id, "Paper added");
        Ok(node)
    }

    /// Decompose a paper node into concepts and attach its citations, then
    /// re-run the layout.
    pub async fn expand_paper(&self, node_id: &str) -> Result<ExpansionReport> {
        let ticket = self.in_flight.try_acquire(OperationKind::Expansion, node_id)?;

        let snapshot = self.snapshot().await;
        let node = snapshot.node(node_id).ok_or_else(|| AppError::NodeNotFound {
            id: node_id.to_string(),
        })?;
        let NodeData::Paper(paper) = &node.data else {
            return Err(AppError::validation(
                "node_id",
                format!("Only paper nodes can be expanded, {} is a {}", node_id, node.kind()),
            ));
        };

        let worker = self.clone();
        let node_id = node_id.to_string();
        let paper = paper.clone();
        detached(OperationKind::Expansion, async move {
            let _ticket = ticket;
            worker.run_expansion(&node_id, &paper).await
        })
        .await
    }

    async fn run_expansion(&self, node_id: &str, paper: &Paper) -> Result<ExpansionReport> {
        let expansion = self.expander.expand(&paper.title, &paper.summary).await?;
        let citations = self.fetch_citations(paper).await;

        let policy = self.policy;
        let options = self.layout.clone();
        let ids = self
            .update(|state| {
                let (next, ids) = state.apply_expansion(node_id, &expansion.concepts, &citations, policy)?;
                let positioned = layout(next.nodes(), next.edges(), &options);
                Ok((next.with_positions(&positioned), ids))
            })
            .await?;

        metrics::record_expansion(ids.concept_node_ids.len(), ids.citation_node_ids.len(), expansion.used_fallback);
        info!(
            node_id,
            concepts = ids.concept_node_ids.len(),
            citations = ids.citation_node_ids.len(),
            used_fallback = expansion.used_fallback,
            "Paper expanded"
        );

        Ok(ExpansionReport {
            node_id: node_id.to_string(),
            ids,
            used_fallback: expansion.used_fallback,
        })
    }

    /// Reference list of a paper as ghost papers. Lookup failures yield no
    /// citations.
    async fn fetch_citations(&self, paper: &Paper) -> Vec<Paper> {
        let Some(bib_id) = paper.paper_id.as_deref() else {
            return Vec::new();
        };

        match self.bibliography.references(bib_id, self.reference_limit).await {
            Ok(references) => references
                .iter()
                .take(self.max_citation_nodes)
                .enumerate()
                .map(|(i, reference)| reference.to_ghost(i))
                .collect(),
            Err(e) => {
                warn!(error = %e, paper_id = bib_id, "Reference lookup failed, expanding without citations");
                metrics::record_fallback("references");
                Vec::new()
            }
        }
    }

    /// Connect two papers with a `related` edge (reusing one in either
    /// direction) and classify it. The stored edge's source is Paper A.
    pub async fn analyze_relationship(&self, source: &str, target: &str) -> Result<RelationshipOutcome> {
        let (edge_id, created) = self
            .update(|state| {
                let (next, id, created) = state.upsert_edge(source, target, EdgeKind::Related)?;
                Ok((next, (id, created)))
            })
            .await?;

        debug!(edge_id = %edge_id, created, "Relationship edge resolved");
        self.analyze_edge(&edge_id).await
    }

    /// Classify the relationship carried by an existing `related` edge
    pub async fn analyze_edge(&self, edge_id: &str) -> Result<RelationshipOutcome> {
        let ticket = self.in_flight.try_acquire(OperationKind::Analysis, edge_id)?;

        let snapshot = self.snapshot().await;
        let edge = snapshot.edge(edge_id).ok_or_else(|| AppError::EdgeNotFound {
            id: edge_id.to_string(),
        })?;
        if edge.kind != EdgeKind::Related {
            return Err(AppError::validation(
                "edge_id",
                format!("Only related edges carry a relationship, {} is a {} edge", edge_id, edge.kind.as_str()),
            ));
        }
        let paper_a = snapshot.paper(&edge.source)?.clone();
        let paper_b = snapshot.paper(&edge.target)?.clone();

        let worker = self.clone();
        let edge_id = edge_id.to_string();
        detached(OperationKind::Analysis, async move {
            let _ticket = ticket;
            worker.run_analysis(&edge_id, &paper_a, &paper_b).await
        })
        .await
    }

    async fn run_analysis(&self, edge_id: &str, paper_a: &Paper, paper_b: &Paper) -> Result<RelationshipOutcome> {
        self.update(|state| Ok((state.mark_analyzing(edge_id, true)?, ())))
            .await?;

        let analysis = self.classifier.analyze(paper_a, paper_b).await;
        let relationship = analysis.relationship.clone();

        let edge = self
            .update(|state| {
                let next = state.record_relationship(edge_id, relationship)?;
                let edge = next.edge(edge_id).cloned().ok_or_else(|| AppError::EdgeNotFound {
                    id: edge_id.to_string(),
                })?;
                Ok((next, edge))
            })
            .await?;

        metrics::record_relationship(analysis.relationship.relation_type.as_str());
        info!(
            edge_id,
            relation_type = %analysis.relationship.relation_type,
            confidence = analysis.relationship.confidence_score,
            chunks = analysis.citation_chunks_found,
            "Relationship recorded"
        );

        Ok(RelationshipOutcome {
            edge,
            citation_chunks_found: analysis.citation_chunks_found,
            used_fallback: analysis.used_fallback,
        })
    }

    /// Answer a question about the papers joined by an edge
    pub async fn chat(&self, edge_id: &str, question: &str, history: &[ChatMessage]) -> Result<String> {
        let snapshot = self.snapshot().await;
        let edge = snapshot.edge(edge_id).ok_or_else(|| AppError::EdgeNotFound {
            id: edge_id.to_string(),
        })?;
        let source = snapshot.paper(&edge.source)?;
        let target = snapshot.paper(&edge.target)?;

        self.chat
            .answer(question, source, target, edge.relationship.as_ref(), history)
            .await
    }

    /// Re-run the layout over the whole graph
    pub async fn relayout(&self, direction: Option<LayoutDirection>) -> Result<Arc<GraphState>> {
        let options = match direction {
            Some(direction) => self.layout.clone().with_direction(direction),
            None => self.layout.clone(),
        };

        self.update(|state| {
            let positioned = layout(state.nodes(), state.edges(), &options);
            Ok((state.with_positions(&positioned), ()))
        })
        .await?;

        Ok(self.snapshot().await)
    }

    pub async fn enrich_summary(&self, node_id: &str, summary: &str) -> Result<GraphNode> {
        self.update(|state| {
            let next = state.enrich_summary(node_id, summary)?;
            let node = next.node(node_id).cloned().ok_or_else(|| AppError::NodeNotFound {
                id: node_id.to_string(),
            })?;
            Ok((next, node))
        })
        .await
    }

    /// Best bibliographic match for `query`. Lookup failures count as no
    /// match.
    pub async fn search_paper(&self, query: &str) -> Result<ScholarPaper> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("query", "Search query is required"));
        }

        let found = match self.bibliography.search_paper(query).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, query, "Paper search failed");
                None
            }
        };

        found.ok_or_else(|| AppError::PaperNotFound {
            id: query.to_string(),
        })
    }
}

/// Run `task` to completion on its own tokio task, independent of whether
/// the caller keeps polling.
async fn detached<T, F>(kind: OperationKind, task: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(task).await.map_err(|e| AppError::Internal {
        message: format!("{} task failed: {}", kind.as_str(), e),
    })?
}
