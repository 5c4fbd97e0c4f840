//! PaperGraph Common Library
//!
//! Shared code for the PaperGraph workspace including:
//! - Paper, concept and relationship models
//! - Language-model and bibliographic collaborator clients
//! - The relationship-inference pipeline (chunking, evidence, classification)
//! - Concept expansion
//! - Error types, configuration and metrics

pub mod config;
pub mod context;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod scholar;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::LanguageModel;
pub use models::{Concept, Importance, Paper, RelationType, Relationship};
pub use scholar::BibliographySource;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default local language model
pub const DEFAULT_LLM_MODEL: &str = "llama3.2:3b";
