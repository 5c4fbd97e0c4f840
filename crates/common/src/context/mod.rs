//! Relationship and Concept Inference
//!
//! The inference layer that provides:
//! - Citation chunking (where does one paper mention another)
//! - Evidence assembly
//! - Relationship classification
//! - Concept expansion
//! - Question answering over an analyzed pair

mod citation_chunker;
mod classifier;
mod concept_expander;
mod evidence;
mod relationship_chat;

pub use citation_chunker::{extract_citation_chunks, Chunk, ChunkerConfig, CitationChunker};
pub use classifier::{parse_relationship_reply, system_prompt, RelationshipAnalysis, RelationshipClassifier};
pub use concept_expander::{fallback_concepts, parse_concepts_reply, ConceptExpander, ConceptExpansion};
pub use evidence::{combine_chunks_for_analysis, summary_evidence, DEFAULT_MAX_CONTEXT_LENGTH};
pub use relationship_chat::{ChatMessage, ChatRole, RelationshipChat, CHAT_ERROR_ANSWER, EMPTY_ANSWER};
