//! Structured reply parsing
//!
//! Models are asked for bare JSON but frequently wrap it in a fenced code
//! block or add a sentence around it. Parsing is strict about the schema and
//! lenient about that wrapping only.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("empty reply")]
    Empty,

    #[error("reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("reply does not match schema: {0}")]
    Schema(String),
}

/// Remove an enclosing ```` ```json ```` / ```` ``` ```` fence, if present
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse a model reply into `T`.
///
/// Falls back to the outermost `{...}` span when the reply has prose around
/// the object.
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Result<T, ReplyError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ReplyError::Empty);
    }

    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(err) => match (cleaned.find('{'), cleaned.rfind('}')) {
            (Some(start), Some(end)) if start > 0 || end + 1 < cleaned.len() => {
                if start >= end {
                    return Err(ReplyError::InvalidJson(err));
                }
                Ok(serde_json::from_str(&cleaned[start..=end])?)
            }
            _ => Err(ReplyError::InvalidJson(err)),
        },
    }
}
