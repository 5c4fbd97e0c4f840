//! Evidence assembly
//!
//! Concatenates chunk contexts, best first, into one bounded block of text
//! for the classifier.

use super::citation_chunker::Chunk;
use crate::models::Paper;

/// Default character budget for assembled evidence
pub const DEFAULT_MAX_CONTEXT_LENGTH: usize = 2000;

/// Separator placed between chunk contexts
const SEPARATOR: &str = "\n\n";

/// Join chunk contexts in order until the next one would push the running
/// length past `max_length`. Stops at the first chunk that does not fit.
///
/// Lengths are measured in characters. The running length counts each
/// separator, the budget check does not.
pub fn combine_chunks_for_analysis(chunks: &[Chunk], max_length: usize) -> String {
    let mut combined = String::new();
    let mut length = 0usize;

    for chunk in chunks {
        let context_len = chunk.context.chars().count();
        if length + context_len > max_length {
            break;
        }
        combined.push_str(&chunk.context);
        combined.push_str(SEPARATOR);
        length += context_len + SEPARATOR.len();
    }

    combined.trim().to_string()
}

/// Evidence used when no citation chunks were found: the two summaries,
/// framed so the classifier can tell which paper is which.
pub fn summary_evidence(paper_a: &Paper, paper_b: &Paper) -> String {
    format!(
        "Paper A Summary: {}\n\nPaper B Summary: {}",
        paper_a.summary, paper_b.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(context: &str) -> Chunk {
        Chunk {
            text: context.to_string(),
            context: context.to_string(),
            relevance_score: 0.5,
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(combine_chunks_for_analysis(&[], 2000), "");
    }

    #[test]
    fn test_joins_in_order() {
        let chunks = vec![chunk("first context"), chunk("second context")];
        assert_eq!(
            combine_chunks_for_analysis(&chunks, 2000),
            "first context\n\nsecond context"
        );
    }

    #[test]
    fn test_stops_at_first_overflow() {
        let chunks = vec![chunk(&"a".repeat(1500)), chunk(&"b".repeat(600)), chunk("short")];
        let combined = combine_chunks_for_analysis(&chunks, 2000);

        // The 600-char chunk overflows; the short one after it is not tried
        assert_eq!(combined, "a".repeat(1500));
    }

    #[test]
    fn test_exact_budget_fits() {
        let chunks = vec![chunk(&"a".repeat(2000))];
        assert_eq!(combine_chunks_for_analysis(&chunks, 2000).len(), 2000);
    }

    #[test]
    fn test_first_chunk_too_long() {
        let chunks = vec![chunk(&"a".repeat(2001)), chunk("short")];
        assert_eq!(combine_chunks_for_analysis(&chunks, 2000), "");
    }

    #[test]
    fn test_separator_counts_toward_running_length() {
        // 999 + 2 + 999 = 2000 fits; one more char would not
        let chunks = vec![chunk(&"a".repeat(999)), chunk(&"b".repeat(999))];
        assert_eq!(combine_chunks_for_analysis(&chunks, 2000).chars().count(), 2000);

        let chunks = vec![chunk(&"a".repeat(999)), chunk(&"b".repeat(1000))];
        assert_eq!(combine_chunks_for_analysis(&chunks, 2000), "a".repeat(999));
    }

    #[test]
    fn test_summary_evidence_framing() {
        let a = Paper::new("A", "about coloring");
        let b = Paper::new("B", "about scheduling");
        assert_eq!(
            summary_evidence(&a, &b),
            "Paper A Summary: about coloring\n\nPaper B Summary: about scheduling"
        );
    }
}
