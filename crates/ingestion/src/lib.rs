//! PaperGraph Ingestion
//!
//! Extracts text from uploaded PDF documents and detects their title and
//! abstract so they can be added to the graph as paper nodes.

pub mod document;
pub mod errors;
pub mod pdf;

pub use document::{extract_document, ExtractedDocument};
pub use errors::IngestionError;
