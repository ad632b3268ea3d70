// Retrieval Engine Module
pub mod engine;

pub use engine::{
    cosine_similarity, ScoredDocument, SimilarityRanker, DEFAULT_CANDIDATE_K, DEFAULT_TOP_K,
};
