//! PaperGraph Graph Store
//!
//! The incremental knowledge graph:
//! - Node/edge types and the immutable `GraphState`
//! - Hierarchical layout
//! - In-flight operation guards
//! - `GraphController`, which applies expansions and relationship analyses

pub mod controller;
pub mod guard;
pub mod layout;
pub mod state;
pub mod types;

pub use controller::{ExpansionReport, GraphController, RelationshipOutcome};
pub use guard::{InFlightRegistry, InFlightTicket, OperationKind};
pub use layout::{layout, LayoutOptions};
pub use state::{ExpansionIds, GraphState};
pub use types::{CitationNode, ConceptNode, EdgeKind, GraphEdge, GraphNode, NodeData, Position};
