// Re-ranking Module
pub mod scorer;

pub use scorer::{
    parse_score, scoring_prompt, LlmReranker, RankedDocument, DEFAULT_RERANK_CONCURRENCY,
    FALLBACK_SCORE,
};
