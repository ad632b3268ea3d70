// End-to-end RAG pipeline: retrieve -> (rerank) -> answer
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{BuddyError, Result};
use crate::providers::{GenerationOptions, GenerativeModel};
use crate::rag::context::{ContextBuilder, ContextConfig};
use crate::rag::documents::Document;
use crate::rag::reranking::{LlmReranker, DEFAULT_RERANK_CONCURRENCY};
use crate::rag::retrieval::{ScoredDocument, SimilarityRanker, DEFAULT_CANDIDATE_K, DEFAULT_TOP_K};

/// RAG pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Passages used for the answer
    pub top_k: usize,
    /// First-stage candidates when reranking
    pub candidate_k: usize,
    /// Enable the second (model-scored) stage
    pub rerank: bool,
    /// Scoring calls in flight at once
    pub rerank_concurrency: usize,
    /// Answer prompt configuration
    pub context: ContextConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            candidate_k: DEFAULT_CANDIDATE_K,
            rerank: true,
            rerank_concurrency: DEFAULT_RERANK_CONCURRENCY,
            context: ContextConfig::default(),
        }
    }
}

impl RagConfig {
    /// Check passage counts, concurrency and answer temperature
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 || self.candidate_k == 0 {
            return Err(BuddyError::ConfigError(
                "top_k and candidate_k must be greater than 0".to_string(),
            ));
        }

        if self.rerank && self.top_k > self.candidate_k {
            return Err(BuddyError::ConfigError(format!(
                "top_k ({}) must not exceed candidate_k ({}) when reranking",
                self.top_k, self.candidate_k
            )));
        }

        if self.rerank_concurrency == 0 {
            return Err(BuddyError::ConfigError(
                "rerank_concurrency must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.context.temperature) {
            return Err(BuddyError::ConfigError(
                "answer_temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Passage selected for the answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub document: Document,
    pub similarity: f32,
    /// Set when the reranking stage ran
    pub rerank_score: Option<f32>,
}

/// Outcome of retrieval with the stage details kept for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    /// First-stage results, best first
    pub candidates: Vec<ScoredDocument>,
    /// Final passages, best first
    pub passages: Vec<RetrievedPassage>,
}

/// RAG pipeline result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub question: String,
    pub retrieval: Retrieval,
    /// Prompt sent to the model
    pub prompt: String,
    pub answer: String,
}

impl RagAnswer {
    pub fn sources(&self) -> &[RetrievedPassage] {
        &self.retrieval.passages
    }
}

/// End-to-end RAG pipeline
pub struct RagPipeline {
    ranker: SimilarityRanker,
    reranker: Option<LlmReranker>,
    context_builder: ContextBuilder,
    model: Arc<dyn GenerativeModel>,
    config: RagConfig,
}

impl RagPipeline {
    /// Create pipeline over a built ranker
    pub fn new(ranker: SimilarityRanker, model: Arc<dyn GenerativeModel>, config: RagConfig) -> Self {
        let reranker = config
            .rerank
            .then(|| LlmReranker::new(model.clone()).with_concurrency(config.rerank_concurrency));
        Self {
            ranker,
            reranker,
            context_builder: ContextBuilder::with_config(config.context.clone()),
            model,
            config,
        }
    }

    /// One-stage or two-stage retrieval, per config
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        match &self.reranker {
            None => {
                let candidates = self.ranker.top_k(query, self.config.top_k).await?;
                let passages = candidates
                    .iter()
                    .map(|c| RetrievedPassage {
                        document: c.document.clone(),
                        similarity: c.score,
                        rerank_score: None,
                    })
                    .collect();
                Ok(Retrieval { candidates, passages })
            }
            Some(reranker) => {
                let candidates = self.ranker.top_k(query, self.config.candidate_k).await?;
                debug!(candidates = candidates.len(), "reranking candidates");
                let passages = reranker
                    .rerank(query, candidates.clone(), self.config.top_k)
                    .await
                    .into_iter()
                    .map(|r| RetrievedPassage {
                        document: r.document,
                        similarity: r.similarity,
                        rerank_score: Some(r.rerank_score),
                    })
                    .collect();
                Ok(Retrieval { candidates, passages })
            }
        }
    }

    /// Retrieve, build the grounded prompt and ask the model
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let retrieval = self.retrieve(question).await?;
        let passages: Vec<Document> = retrieval.passages.iter().map(|p| p.document.clone()).collect();
        let prompt = self.context_builder.answer_prompt(question, &passages);

        let options = GenerationOptions::with_temperature(self.config.context.temperature);
        let answer = self.model.complete(&prompt, options).await?;
        info!(sources = passages.len(), "answer generated");

        Ok(RagAnswer {
            question: question.to_string(),
            retrieval,
            prompt,
            answer,
        })
    }

    /// Get current configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn ranker(&self) -> &SimilarityRanker {
        &self.ranker
    }
}
