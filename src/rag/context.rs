// Context builder for RAG answer prompts
use serde::{Deserialize, Serialize};

use crate::rag::documents::Document;

/// Default answer language
pub const DEFAULT_ANSWER_LANGUAGE: &str = "Traditional Chinese";

/// Default answer temperature
pub const DEFAULT_ANSWER_TEMPERATURE: f32 = 0.2;

/// Answer prompt configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Language the answer must be written in
    pub answer_language: String,
    /// Sampling temperature for the answer call
    pub temperature: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            answer_language: DEFAULT_ANSWER_LANGUAGE.to_string(),
            temperature: DEFAULT_ANSWER_TEMPERATURE,
        }
    }
}

/// Builds the grounded answer prompt
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    /// Create new context builder with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// `[Source n]` blocks numbered from 1, in the given order
    pub fn build(&self, passages: &[Document]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("[Source {}]\n{}", i + 1, doc.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full answer prompt: instructions, retrieved passages, question
    pub fn answer_prompt(&self, question: &str, passages: &[Document]) -> String {
        format!(
            "You are a customer support assistant and must answer from the FAQ passages below.\n\
             They are the most similar entries the system retrieved from the knowledge base.\n\
             Base your answer on them; even if they are only partially related, reason from the \
             available information. Do not reply that the answer was not found or not mentioned.\n\n\
             Answer in {}.\n\n\
             === Retrieved FAQ passages ===\n{}\n\n\
             === User question ===\n{}\n",
            self.config.answer_language,
            self.build(passages),
            question
        )
    }

    /// Get current configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}
