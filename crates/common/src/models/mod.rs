//! Domain models shared across the workspace

pub mod concept;
pub mod paper;
pub mod relationship;

pub use concept::{Concept, Importance};
pub use paper::{NewPaper, Paper};
pub use relationship::{RelationType, Relationship};
