// RAG (Retrieval-Augmented Generation) over a plain-text FAQ
//
// Components:
// - Documents: blank-line separated FAQ records
// - Retrieval: cosine similarity over provider embeddings
// - Re-ranking: model-scored relevance of the first-stage candidates
// - Context Builder: grounded answer prompt
// - Pipeline: end-to-end orchestration

pub mod documents;
pub mod retrieval;
pub mod reranking;
pub mod context;
pub mod pipeline;

// Re-export key types
pub use documents::{Document, DocumentStore};
pub use retrieval::{cosine_similarity, ScoredDocument, SimilarityRanker};
pub use reranking::{parse_score, LlmReranker, RankedDocument};
pub use context::{ContextBuilder, ContextConfig};
pub use pipeline::{RagAnswer, RagConfig, RagPipeline, RetrievedPassage, Retrieval};
