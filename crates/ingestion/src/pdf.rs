//! PDF text extraction module
//!
//! Extracts text content from in-memory PDF documents using lopdf.
//! Line structure is kept: every text block and line move starts a new line.

use crate::errors::IngestionError;
use lopdf::{Document, Object};
use tracing::{debug, warn};

/// Text and metadata pulled out of a PDF
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfText {
    /// Cleaned text of each page, in page order
    pub pages: Vec<String>,
    /// Document info `Title`, when set
    pub title: Option<String>,
}

impl PdfText {
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// All pages joined by newlines
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .filter(|page| !page.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Extract text content from PDF bytes
pub fn extract_text_from_pdf(bytes: &[u8], file_name: &str) -> Result<PdfText, IngestionError> {
    let doc = Document::load_mem(bytes).map_err(|e| IngestionError::PdfParseError {
        file_name: file_name.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(file_name, page_count = pages.len(), "Extracting text from PDF");

    let mut texts = Vec::with_capacity(pages.len());
    for (page_num, page_id) in pages {
        match doc.get_page_content(page_id) {
            Ok(content) => texts.push(clean_text(&extract_text_from_content(&content))),
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
                texts.push(String::new());
            }
        }
    }

    let extracted = PdfText {
        pages: texts,
        title: info_title(&doc),
    };

    if extracted.pages.iter().all(|page| page.is_empty()) {
        return Err(IngestionError::NoText {
            file_name: file_name.to_string(),
        });
    }

    debug!(
        file_name,
        chars = extracted.pages.iter().map(String::len).sum::<usize>(),
        has_title = extracted.title.is_some(),
        "Text extraction complete"
    );

    Ok(extracted)
}

/// `Title` entry of the trailer's info dictionary
fn info_title(doc: &Document) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };

    match info.get(b"Title").ok()? {
        Object::String(bytes, _) => {
            let title = decode_text_string(bytes);
            let title = title.trim();
            (!title.is_empty()).then(|| title.to_string())
        }
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, else Latin-1
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Extract text from PDF content stream
fn extract_text_from_content(content: &[u8]) -> String {
    // Simple text extraction - looks for text between BT and ET operators
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push('\n');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            if is_line_move(trimmed) && !current_text.is_empty() {
                current_text.push('\n');
            }
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    text
}

fn is_line_move(op: &str) -> bool {
    op == "T*" || op.ends_with(" Td") || op.ends_with(" TD") || op.ends_with(" Tm")
}

/// Extract text from a PDF text operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // Handle (text) Tj operator
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
            if start < end {
                return Some(decode_pdf_string(&line[start + 1..end]));
            }
        }
    }

    // Handle [(text) num (text) num] TJ operator (array of text)
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => in_paren = true,
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse whitespace inside each line, drop empty lines, normalize quotes
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}
