//! Hierarchical layout
//!
//! Layered placement in four passes:
//! 1. Cycle removal: DFS back edges are ignored
//! 2. Ranking: longest path from the sources
//! 3. Ordering: barycenter sweeps, ties broken by insertion order
//! 4. Coordinates: every rank centered on the widest one
//!
//! All nodes share one box size. Positions are top-left corners.

use crate::types::{GraphEdge, GraphNode, Position};
use papergraph_common::config::{GraphConfig, LayoutDirection};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Down+up sweep pairs in the ordering pass
const SWEEPS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between neighbours in one rank
    pub node_sep: f64,
    /// Gap between ranks
    pub rank_sep: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopBottom,
            node_width: 280.0,
            node_height: 200.0,
            node_sep: 100.0,
            rank_sep: 150.0,
        }
    }
}

impl From<&GraphConfig> for LayoutOptions {
    fn from(config: &GraphConfig) -> Self {
        Self {
            direction: config.direction,
            node_width: config.node_width,
            node_height: config.node_height,
            node_sep: config.node_sep,
            rank_sep: config.rank_sep,
        }
    }
}

impl LayoutOptions {
    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Compute positions for `nodes`. Returns the nodes in input order with
/// only their positions changed. Edges with an unknown endpoint are
/// skipped.
pub fn layout(nodes: &[GraphNode], edges: &[GraphEdge], options: &LayoutOptions) -> Vec<GraphNode> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(nodes.len(), edges.len());
    let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.insert(node.id.as_str(), graph.add_node(i));
    }
    for edge in edges {
        if let (Some(&source), Some(&target)) = (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            if source != target {
                graph.update_edge(source, target, ());
            }
        }
    }

    let dag = remove_back_edges(&graph);
    let ranks = longest_path_ranks(&dag);
    let layers = order_layers(&dag, &ranks);
    let positions = assign_coordinates(&dag, &layers, options);

    nodes
        .iter()
        .zip(positions)
        .map(|(node, position)| GraphNode {
            position,
            ..node.clone()
        })
        .collect()
}

fn remove_back_edges(graph: &DiGraph<usize, ()>) -> DiGraph<usize, ()> {
    let mut back_edges = HashSet::new();
    depth_first_search(graph, graph.node_indices(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back_edges.insert((u, v));
        }
    });

    // Keeping every node preserves node indices
    graph.filter_map(
        |_, weight| Some(*weight),
        |edge, _| {
            let endpoints = graph.edge_endpoints(edge)?;
            (!back_edges.contains(&endpoints)).then_some(())
        },
    )
}

fn longest_path_ranks(dag: &DiGraph<usize, ()>) -> Vec<usize> {
    let mut ranks = vec![0; dag.node_count()];
    let Ok(order) = toposort(dag, None) else {
        return ranks;
    };

    for node in order {
        ranks[node.index()] = dag
            .neighbors_directed(node, Direction::Incoming)
            .map(|pred| ranks[pred.index()] + 1)
            .max()
            .unwrap_or(0);
    }
    ranks
}

fn order_layers(dag: &DiGraph<usize, ()>, ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let depth = ranks.iter().max().map_or(0, |max| max + 1);
    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); depth];
    for node in dag.node_indices() {
        layers[ranks[node.index()]].push(node);
    }

    let mut order = vec![0usize; dag.node_count()];
    for layer in &layers {
        for (i, node) in layer.iter().enumerate() {
            order[node.index()] = i;
        }
    }

    for _ in 0..SWEEPS {
        for r in 1..layers.len() {
            reorder(dag, &mut layers[r], &mut order, Direction::Incoming);
        }
        for r in (0..layers.len().saturating_sub(1)).rev() {
            reorder(dag, &mut layers[r], &mut order, Direction::Outgoing);
        }
    }

    layers
}

/// Sort one layer by the mean order of its neighbours in `direction`.
/// A node without such neighbours keeps its current slot as its weight.
fn reorder(dag: &DiGraph<usize, ()>, layer: &mut [NodeIndex], order: &mut [usize], direction: Direction) {
    let barycenter = |node: NodeIndex| {
        let (sum, count) = dag
            .neighbors_directed(node, direction)
            .fold((0.0, 0usize), |(sum, count), nb| (sum + order[nb.index()] as f64, count + 1));
        if count == 0 {
            order[node.index()] as f64
        } else {
            sum / count as f64
        }
    };

    let mut keyed: Vec<(f64, NodeIndex)> = layer.iter().map(|&n| (barycenter(n), n)).collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.index().cmp(&b.1.index())));

    for (i, (_, node)) in keyed.into_iter().enumerate() {
        layer[i] = node;
        order[node.index()] = i;
    }
}

fn assign_coordinates(dag: &DiGraph<usize, ()>, layers: &[Vec<NodeIndex>], options: &LayoutOptions) -> Vec<Position> {
    // Breadth runs along a rank, depth across ranks
    let (breadth, depth) = match options.direction {
        LayoutDirection::TopBottom => (options.node_width, options.node_height),
        LayoutDirection::LeftRight => (options.node_height, options.node_width),
    };
    let span = |count: usize| {
        if count == 0 {
            0.0
        } else {
            count as f64 * breadth + (count - 1) as f64 * options.node_sep
        }
    };
    let widest = span(layers.iter().map(Vec::len).max().unwrap_or(0));

    let mut positions = vec![Position::default(); dag.node_count()];
    for (rank, layer) in layers.iter().enumerate() {
        let offset = (widest - span(layer.len())) / 2.0;
        let v = rank as f64 * (depth + options.rank_sep) + depth / 2.0;

        for (i, &node) in layer.iter().enumerate() {
            let u = offset + i as f64 * (breadth + options.node_sep) + breadth / 2.0;
            let (cx, cy) = match options.direction {
                LayoutDirection::TopBottom => (u, v),
                LayoutDirection::LeftRight => (v, u),
            };
            positions[dag[node]] = Position::new(
                cx - options.node_width / 2.0,
                cy - options.node_height / 2.0,
            );
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeKind, NodeData};
    use papergraph_common::models::Paper;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            position: Position::new(123.0, 456.0),
            data: NodeData::Paper(Paper::new(id, "")),
        }
    }

    fn edge(source: &str, target: &str) -> GraphEdge {
        GraphEdge::new(format!("edge-{}-{}", source, target), source, target, EdgeKind::Related)
    }

    fn position_of(nodes: &[GraphNode], id: &str) -> Position {
        nodes.iter().find(|n| n.id == id).map(|n| n.position).unwrap()
    }

    #[test]
    fn test_empty_graph() {
        assert!(layout(&[], &[], &LayoutOptions::default()).is_empty());
    }

    #[test]
    fn test_single_node_at_origin() {
        let placed = layout(&[node("a")], &[], &LayoutOptions::default());
        assert_eq!(placed[0].position, Position::new(0.0, 0.0));
        assert_eq!(placed[0].id, "a");
    }

    #[test]
    fn test_chain_top_bottom() {
        let nodes = [node("a"), node("b"), node("c")];
        let edges = [edge("a", "b"), edge("b", "c")];
        let placed = layout(&nodes, &edges, &LayoutOptions::default());

        assert_eq!(position_of(&placed, "a"), Position::new(0.0, 0.0));
        assert_eq!(position_of(&placed, "b"), Position::new(0.0, 350.0));
        assert_eq!(position_of(&placed, "c"), Position::new(0.0, 700.0));
    }

    #[test]
    fn test_chain_left_right_swaps_axes() {
        let nodes = [node("a"), node("b")];
        let edges = [edge("a", "b")];
        let options = LayoutOptions::default().with_direction(LayoutDirection::LeftRight);
        let placed = layout(&nodes, &edges, &options);

        assert_eq!(position_of(&placed, "a"), Position::new(0.0, 0.0));
        assert_eq!(position_of(&placed, "b"), Position::new(430.0, 0.0));
    }

    #[test]
    fn test_parent_centered_over_children() {
        let nodes = [node("p"), node("c1"), node("c2")];
        let edges = [edge("p", "c1"), edge("p", "c2")];
        let placed = layout(&nodes, &edges, &LayoutOptions::default());

        assert_eq!(position_of(&placed, "p"), Position::new(190.0, 0.0));
        assert_eq!(position_of(&placed, "c1"), Position::new(0.0, 350.0));
        assert_eq!(position_of(&placed, "c2"), Position::new(380.0, 350.0));
    }

    #[test]
    fn test_barycenter_uncrosses_edges() {
        // Children inserted in the opposite order of their parents
        let nodes = [node("p1"), node("p2"), node("c2"), node("c1")];
        let edges = [edge("p1", "c1"), edge("p2", "c2")];
        let placed = layout(&nodes, &edges, &LayoutOptions::default());

        assert!(position_of(&placed, "p1").x < position_of(&placed, "p2").x);
        assert!(position_of(&placed, "c1").x < position_of(&placed, "c2").x);
    }

    #[test]
    fn test_cycle_is_broken() {
        let nodes = [node("a"), node("b")];
        let edges = [edge("a", "b"), edge("b", "a")];
        let placed = layout(&nodes, &edges, &LayoutOptions::default());

        assert_eq!(position_of(&placed, "a").y, 0.0);
        assert_eq!(position_of(&placed, "b").y, 350.0);
    }

    #[test]
    fn test_unknown_endpoints_and_self_loops_ignored() {
        let nodes = [node("a"), node("b")];
        let edges = [edge("a", "ghost"), edge("a", "a")];
        let placed = layout(&nodes, &edges, &LayoutOptions::default());

        // Two unconnected nodes share rank 0
        assert_eq!(position_of(&placed, "a"), Position::new(0.0, 0.0));
        assert_eq!(position_of(&placed, "b"), Position::new(380.0, 0.0));
    }

    #[test]
    fn test_deterministic_and_order_preserving() {
        let nodes: Vec<GraphNode> = (0..12).map(|i| node(&format!("n{}", i))).collect();
        let edges: Vec<GraphEdge> = (1..12)
            .map(|i| edge(&format!("n{}", i / 3), &format!("n{}", i)))
            .collect();
        let options = LayoutOptions::default();

        let first = layout(&nodes, &edges, &options);
        let second = layout(&nodes, &edges, &options);

        assert_eq!(first, second);
        let ids: Vec<&str> = first.iter().map(|n| n.id.as_str()).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("n{}", i)).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_options_from_config() {
        let options = LayoutOptions::from(&GraphConfig::default());
        assert_eq!(options, LayoutOptions::default());
    }
}
