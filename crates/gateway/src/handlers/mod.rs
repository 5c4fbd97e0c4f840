//! API handlers module

pub mod documents;
pub mod edges;
pub mod graph;
pub mod health;
pub mod papers;
pub mod relationships;
