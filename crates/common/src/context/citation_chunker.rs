//! Citation Chunker - Locates where one paper discusses another
//!
//! Provides:
//! - Sentence splitting with a noise filter
//! - Title-word and author-name matching
//! - Relevance scoring and top-k selection
//!
//! Matching is purely lexical: a sentence qualifies when it contains a
//! significant word of the cited title or of a cited author's name.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// A sentence that plausibly refers to the cited paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// The matching sentence, trimmed
    pub text: String,

    /// Previous + current + next sentence
    pub context: String,

    /// Relevance in [0, 1]
    pub relevance_score: f64,
}

/// Chunker configuration
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunks returned
    pub max_chunks: usize,

    /// Sentences with this many trimmed characters or fewer are noise
    pub min_sentence_chars: usize,

    /// Title/author words with this many characters or fewer are ignored
    pub min_word_chars: usize,

    /// Weight of the title-word match ratio
    pub title_weight: f64,

    /// Weight of an author-name match
    pub author_weight: f64,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunks: 5,
            min_sentence_chars: 20,
            min_word_chars: 3,
            title_weight: 0.7,
            author_weight: 0.3,
        }
    }
}

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]+").expect("sentence boundary pattern is valid"))
}

/// Chunker for citation evidence
#[derive(Debug, Clone, Default)]
pub struct CitationChunker {
    config: ChunkerConfig,
}

impl CitationChunker {
    /// Create a new chunker
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Find the sentences of `paper_text` that mention the cited paper,
    /// best first.
    pub fn extract(&self, paper_text: &str, cited_title: &str, cited_authors: &[String]) -> Vec<Chunk> {
        let title_words = self.significant_words(cited_title);
        let author_words: Vec<String> = cited_authors
            .iter()
            .flat_map(|author| self.significant_words(author))
            .collect();

        let sentences = self.split_sentences(paper_text);
        let mut chunks = Vec::new();

        for (i, sentence) in sentences.iter().enumerate() {
            let lower = sentence.to_lowercase();

            let title_matches = title_words
                .iter()
                .filter(|w| lower.contains(w.as_str()))
                .count();
            let author_hit = author_words.iter().any(|w| lower.contains(w.as_str()));

            if title_matches == 0 && !author_hit {
                continue;
            }

            let start = i.saturating_sub(1);
            let end = (i + 2).min(sentences.len());
            let context = sentences[start..end].join(". ").trim().to_string();

            chunks.push(Chunk {
                text: sentence.trim().to_string(),
                context,
                relevance_score: self.score(title_matches, title_words.len(), author_hit),
            });
        }

        // Stable: ties keep document order
        chunks.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        chunks.truncate(self.config.max_chunks);

        debug!(
            sentences = sentences.len(),
            title_words = title_words.len(),
            author_words = author_words.len(),
            chunks = chunks.len(),
            "Citation chunks extracted"
        );

        chunks
    }

    fn score(&self, title_matches: usize, title_words: usize, author_hit: bool) -> f64 {
        // A title made only of short words carries no title signal
        let title_ratio = if title_words == 0 {
            0.0
        } else {
            title_matches as f64 / title_words as f64
        };
        let author = if author_hit { 1.0 } else { 0.0 };

        (self.config.title_weight * title_ratio + self.config.author_weight * author).clamp(0.0, 1.0)
    }

    fn significant_words(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > self.config.min_word_chars)
            .map(str::to_string)
            .collect()
    }

    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        sentence_boundary()
            .split(text)
            .filter(|s| s.trim().chars().count() > self.config.min_sentence_chars)
            .collect()
    }
}

/// Extract citation chunks with the default configuration
pub fn extract_citation_chunks(paper_text: &str, cited_title: &str, cited_authors: &[String]) -> Vec<Chunk> {
    CitationChunker::default().extract(paper_text, cited_title, cited_authors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authors(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_finds_author_mention() {
        let text = "... This work extends the method of Smith et al. (2020) on graph coloring. \
                    Later sections show results.";
        let chunks = extract_citation_chunks(text, "Graph Coloring Algorithms", &authors(&["Jane Smith"]));

        assert!(!chunks.is_empty());
        assert!(chunks
            .iter()
            .any(|c| c.context.contains("extends the method of Smith")));
        assert!(chunks
            .iter()
            .any(|c| c.text.contains("extends the method of Smith")));
    }

    #[test]
    fn test_scores_bounded_sorted_and_capped() {
        let sentence = "We revisit graph coloring heuristics proposed by Smith in detail";
        let text = (0..12)
            .map(|i| format!("{} variant number {}", sentence, i))
            .chain(std::iter::once("Graph coloring algorithms are surveyed by Smith here".to_string()))
            .collect::<Vec<_>>()
            .join(". ");

        let chunks = extract_citation_chunks(&text, "Graph Coloring Algorithms", &authors(&["Jane Smith"]));

        assert_eq!(chunks.len(), 5);
        for chunk in &chunks {
            assert!((0.0..=1.0).contains(&chunk.relevance_score));
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        // All three title words plus the author: capped at 1.0
        assert_eq!(chunks[0].relevance_score, 1.0);
        assert!(chunks[0].text.starts_with("Graph coloring algorithms"));
    }

    #[test]
    fn test_score_weights() {
        let text = "Prior work studied graph partitioning at considerable length. \
                    Unrelated filler sentence about the weather today.";
        let chunks = extract_citation_chunks(text, "Graph Coloring Algorithms", &[]);

        assert_eq!(chunks.len(), 1);
        let expected = 0.7 * (1.0 / 3.0);
        assert!((chunks[0].relevance_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_short_title_words_ignored() {
        // Every title word has three characters or fewer
        let text = "The approach of Vaswani and colleagues is our starting point here. \
                    It is all you need for the job at hand today.";
        let chunks = extract_citation_chunks(text, "Not All You Do", &authors(&["Ashish Vaswani"]));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].relevance_score, 0.3);
        assert!(chunks[0].text.contains("Vaswani"));
    }

    #[test]
    fn test_empty_title_without_authors_matches_nothing() {
        let text = "A perfectly ordinary sentence with enough characters in it.";
        assert!(extract_citation_chunks(text, "", &[]).is_empty());
        assert!(extract_citation_chunks(text, "of an", &[]).is_empty());
    }

    #[test]
    fn test_short_sentences_are_noise() {
        let text = "Graph coloring. Graph coloring! Graph coloring?";
        assert!(extract_citation_chunks(text, "Graph Coloring", &[]).is_empty());
    }

    #[test]
    fn test_context_spans_neighbours() {
        let text = "First sentence is long enough to keep around. \
                    Second sentence talks about graph coloring methods. \
                    Third sentence is also long enough to keep. \
                    Fourth sentence closes the paragraph entirely.";
        let chunks = extract_citation_chunks(text, "Coloring", &[]);

        assert_eq!(chunks.len(), 1);
        let context = &chunks[0].context;
        assert!(context.starts_with("First sentence"));
        assert!(context.contains("Second sentence"));
        assert!(context.contains("Third sentence"));
        assert!(!context.contains("Fourth"));
    }

    #[test]
    fn test_first_sentence_context_clamped() {
        let text = "Graph coloring is the opening topic of this text. \
                    A follow-up sentence that is long enough. \
                    A third sentence that should not appear.";
        let chunks = extract_citation_chunks(text, "Coloring", &[]);

        assert_eq!(
            chunks[0].context,
            "Graph coloring is the opening topic of this text.  A follow-up sentence that is long enough"
        );
    }

    #[test]
    fn test_custom_config() {
        let chunker = CitationChunker::new(ChunkerConfig {
            max_chunks: 1,
            ..ChunkerConfig::default()
        });
        let text = "Graph coloring appears in this first sentence. \
                    Graph coloring appears again in the second one.";
        assert_eq!(chunker.extract(text, "Graph Coloring", &[]).len(), 1);
        assert_eq!(chunker.config().max_chunks, 1);
    }
}
