//! Document extraction
//!
//! Turns an uploaded PDF into the fields needed to add a paper node:
//! a title, a summary and the full text used as citation evidence.

use crate::errors::IngestionError;
use crate::pdf::extract_text_from_pdf;
use regex_lite::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::info;

/// Upper bound on the summary length, in characters
pub const SUMMARY_CHARS: usize = 2000;

/// An abstract needs at least this many characters after its heading
const MIN_ABSTRACT_CHARS: usize = 200;

/// Title line candidates are strictly longer than the first bound and
/// strictly shorter than the second, after trimming
const TITLE_LINE_CHARS: (usize, usize) = (10, 200);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub title: String,
    pub summary: String,
    pub full_text: String,
    pub num_pages: usize,
}

/// Extract title, summary and text from PDF bytes
pub fn extract_document(bytes: &[u8], file_name: &str) -> Result<ExtractedDocument, IngestionError> {
    if !bytes.starts_with(b"%PDF-") {
        return Err(IngestionError::NotPdf {
            file_name: file_name.to_string(),
        });
    }

    let pdf = extract_text_from_pdf(bytes, file_name)?;
    let full_text = pdf.full_text();

    let title = pdf
        .title
        .clone()
        .or_else(|| title_from_text(&full_text))
        .unwrap_or_else(|| title_from_file_name(file_name));
    let summary = summary_from_text(&full_text);

    info!(
        file_name,
        title = %title,
        num_pages = pdf.num_pages(),
        chars = full_text.chars().count(),
        "Document extracted"
    );

    Ok(ExtractedDocument {
        title,
        summary,
        full_text,
        num_pages: pdf.num_pages(),
    })
}

/// First line whose trimmed length is a plausible title
fn title_from_text(text: &str) -> Option<String> {
    let (min, max) = TITLE_LINE_CHARS;
    text.lines()
        .map(str::trim)
        .find(|line| {
            let len = line.chars().count();
            len > min && len < max
        })
        .map(str::to_string)
}

fn title_from_file_name(file_name: &str) -> String {
    file_name.replacen(".pdf", "", 1).trim().to_string()
}

fn abstract_heading() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(r"(?i)(?:abstract|summary)[:\s]*").expect("valid heading regex"))
}

/// Text following the first "Abstract"/"Summary" heading with enough body,
/// else the start of the document
fn summary_from_text(text: &str) -> String {
    for heading in abstract_heading().find_iter(text) {
        let body = &text[heading.end()..];
        if body.chars().nth(MIN_ABSTRACT_CHARS - 1).is_some() {
            return take_chars(body, SUMMARY_CHARS).trim().to_string();
        }
    }
    take_chars(text, SUMMARY_CHARS).to_string()
}

fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
