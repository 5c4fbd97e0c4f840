//! Question answering about a connected pair of papers

use crate::errors::{AppError, Result};
use crate::llm::{ChatRequest, LanguageModel};
use crate::metrics;
use crate::models::{Paper, Relationship};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

const OPERATION: &str = "chat";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Number of trailing history messages included in the prompt
pub const HISTORY_WINDOW: usize = 4;

/// Answer returned when the model is unreachable
pub const CHAT_ERROR_ANSWER: &str = "I encountered an error processing your question. Please try again.";

/// Answer returned when the model replies with nothing
pub const EMPTY_ANSWER: &str = "Unable to generate answer.";

const SYSTEM_PROMPT: &str = "You answer questions about how two academic papers relate: their methods, \
differences, improvements and connections. Ground answers in the paper summaries and the relationship \
metadata provided. Be concise and cite specific details when possible.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One earlier turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

fn describe_paper(label: &str, paper: &Paper) -> String {
    format!(
        "{}:\nTitle: {}\nSummary: {}\nAuthors: {}",
        label,
        paper.title,
        paper.summary,
        paper.authors_display()
    )
}

fn user_prompt(
    question: &str,
    source: &Paper,
    target: &Paper,
    relationship: Option<&Relationship>,
    history: &[ChatMessage],
) -> String {
    let relationship = relationship
        .map(|r| {
            format!(
                "Relationship Type: {}\nSummary: {}\nConfidence: {}",
                r.relation_type, r.summary, r.confidence_score
            )
        })
        .unwrap_or_else(|| "No relationship metadata available.".to_string());

    let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    let history = if recent.is_empty() {
        String::new()
    } else {
        let lines = recent
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!("CONVERSATION HISTORY:\n{}\n\n", lines)
    };

    format!(
        "Answer a question about the relationship between two papers.\n\n\
         {}\n\n{}\n\n\
         RELATIONSHIP CONTEXT:\n{}\n\n\
         {}QUESTION: {}\n\n\
         If the available information does not answer the question, say so.",
        describe_paper("PAPER A (Source)", source),
        describe_paper("PAPER B (Target)", target),
        relationship,
        history,
        question.trim()
    )
}

/// Conversational follow-up over an analyzed edge
#[derive(Clone)]
pub struct RelationshipChat {
    llm: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl RelationshipChat {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Answer `question`. Only an empty question is an error; model
    /// failures produce a fixed apology.
    pub async fn answer(
        &self,
        question: &str,
        source: &Paper,
        target: &Paper,
        relationship: Option<&Relationship>,
        history: &[ChatMessage],
    ) -> Result<String> {
        if question.trim().is_empty() {
            return Err(AppError::validation("question", "Question is required"));
        }

        let request = ChatRequest::new(
            OPERATION,
            SYSTEM_PROMPT,
            user_prompt(question, source, target, relationship, history),
        )
        .temperature(self.temperature);

        match self.llm.complete(request).await {
            Ok(reply) if reply.trim().is_empty() => Ok(EMPTY_ANSWER.to_string()),
            Ok(reply) => Ok(reply.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "Relationship chat failed");
                metrics::record_fallback(OPERATION);
                Ok(CHAT_ERROR_ANSWER.to_string())
            }
        }
    }
}
