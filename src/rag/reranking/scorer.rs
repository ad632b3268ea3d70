// Second-stage reranking: the generative model scores each candidate 0-100
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{BuddyError, Result};
use crate::providers::{GenerationOptions, GenerativeModel};
use crate::rag::documents::Document;
use crate::rag::retrieval::ScoredDocument;

/// Scoring calls in flight at once
pub const DEFAULT_RERANK_CONCURRENCY: usize = 4;

/// Score used when a candidate cannot be scored
pub const FALLBACK_SCORE: f32 = 0.0;

/// Read a relevance score out of a model reply
///
/// Every decimal digit (ASCII or full-width) is kept in order and the
/// result is read as one number, so "第1名: 85分" reads as 185.
pub fn parse_score(text: &str) -> Result<f32> {
    let mut digits = 0usize;
    let mut value = 0f64;
    for c in text.chars() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '０'..='９' => c as u32 - '０' as u32,
            _ => continue,
        };
        value = value * 10.0 + digit as f64;
        digits += 1;
    }

    if digits == 0 {
        return Err(BuddyError::ParseError(format!("no digits in score reply {:?}", text)));
    }
    Ok(value as f32)
}

/// Prompt asking for a single 0-100 relevance score
pub fn scoring_prompt(query: &str, document: &str) -> String {
    format!(
        "Rate how relevant the following FAQ entry is to the question.\n\n\
         Question: {}\n\n\
         FAQ entry:\n{}\n\n\
         Reply with a single number from 0 to 100 only:\n\
         - 100: fully relevant, the FAQ answers the question directly\n\
         - 50: partially relevant, it mentions a related topic\n\
         - 0: not relevant at all\n\n\
         Score:",
        query, document
    )
}

/// Candidate after reranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub document: Document,
    /// First-stage cosine similarity
    pub similarity: f32,
    /// Model relevance score
    pub rerank_score: f32,
    /// Position in the first-stage ranking
    pub candidate_rank: usize,
}

/// Reranker backed by a generative model
pub struct LlmReranker {
    model: Arc<dyn GenerativeModel>,
    concurrency: usize,
}

impl LlmReranker {
    /// Create new reranker with default concurrency
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            concurrency: DEFAULT_RERANK_CONCURRENCY,
        }
    }

    /// Set concurrency; 1 scores candidates one after another
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Score one candidate; failures degrade to `FALLBACK_SCORE`
    async fn score(&self, query: &str, position: usize, text: &str) -> f32 {
        let prompt = scoring_prompt(query, text);
        let outcome = self
            .model
            .complete(&prompt, GenerationOptions::with_temperature(0.0))
            .await
            .and_then(|reply| {
                debug!(candidate = position + 1, reply = %reply.trim(), "rerank reply");
                parse_score(&reply)
            });

        match outcome {
            Ok(score) => score,
            Err(e) => {
                warn!(candidate = position + 1, error = %e, "scoring failed, using fallback score");
                FALLBACK_SCORE
            }
        }
    }

    /// One score per candidate, aligned by index
    pub async fn score_all(&self, query: &str, candidates: &[Document]) -> Vec<f32> {
        stream::iter(
            candidates
                .iter()
                .enumerate()
                .map(|(position, doc)| self.score(query, position, &doc.text)),
        )
        .buffered(self.concurrency)
        .collect()
        .await
    }

    /// Reorder candidates by model score and keep the best `k`
    ///
    /// Equal scores keep their first-stage order.
    pub async fn rerank(&self, query: &str, candidates: Vec<ScoredDocument>, k: usize) -> Vec<RankedDocument> {
        let documents: Vec<Document> = candidates.iter().map(|c| c.document.clone()).collect();
        let scores = self.score_all(query, &documents).await;

        let mut ranked: Vec<RankedDocument> = candidates
            .into_iter()
            .zip(scores)
            .enumerate()
            .map(|(candidate_rank, (candidate, rerank_score))| RankedDocument {
                document: candidate.document,
                similarity: candidate.score,
                rerank_score,
                candidate_rank,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.rerank_score
                .total_cmp(&a.rerank_score)
                .then_with(|| a.candidate_rank.cmp(&b.candidate_rank))
        });
        ranked.truncate(k);
        ranked
    }
}
