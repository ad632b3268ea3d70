// First-stage retrieval: cosine similarity over precomputed embeddings
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{BuddyError, Result};
use crate::providers::{Embedding, EmbeddingProvider};
use crate::rag::documents::{Document, DocumentStore};

/// Documents kept for the final answer
pub const DEFAULT_TOP_K: usize = 2;

/// Candidates handed to the reranker
pub const DEFAULT_CANDIDATE_K: usize = 5;

/// Cosine similarity in [-1, 1]
///
/// `None` when the lengths differ, a vector is empty or has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    similarity.is_finite().then_some(similarity)
}

fn check_vector(what: &str, vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(BuddyError::InvalidData(format!("{} embedding is empty", what)));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(BuddyError::InvalidData(format!("{} embedding has non-finite values", what)));
    }
    if vector.iter().all(|x| *x == 0.0) {
        return Err(BuddyError::InvalidData(format!("{} embedding has zero norm", what)));
    }
    Ok(())
}

/// Document with its similarity to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Ranks the document store against queries
pub struct SimilarityRanker {
    store: DocumentStore,
    embeddings: Vec<Embedding>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SimilarityRanker {
    /// Embed every document once, in order
    pub async fn build(store: DocumentStore, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let mut embeddings = Vec::with_capacity(store.len());
        for document in store.documents() {
            debug!(index = document.index, "embedding document");
            embeddings.push(embedder.embed(&document.text).await?);
        }
        Self::from_parts(store, embeddings, embedder)
    }

    /// Assemble from precomputed embeddings, validating them
    pub fn from_parts(
        store: DocumentStore,
        embeddings: Vec<Embedding>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if embeddings.len() != store.len() {
            return Err(BuddyError::InvalidData(format!(
                "{} embeddings for {} documents",
                embeddings.len(),
                store.len()
            )));
        }

        if let Some(first) = embeddings.first() {
            let dimension = first.len();
            for (index, embedding) in embeddings.iter().enumerate() {
                check_vector(&format!("document {}", index), embedding)?;
                if embedding.len() != dimension {
                    return Err(BuddyError::InvalidData(format!(
                        "document {} has dimension {}, expected {}",
                        index,
                        embedding.len(),
                        dimension
                    )));
                }
            }
        }

        Ok(Self {
            store,
            embeddings,
            embedder,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Embedding dimension, `None` for an empty store
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.first().map(Vec::len)
    }

    /// All documents, best first; ties keep document order
    pub async fn rank(&self, query: &str) -> Result<Vec<ScoredDocument>> {
        if self.store.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(query).await?;
        self.rank_embedding(&query_embedding)
    }

    /// Best `k` documents
    pub async fn top_k(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let mut ranked = self.rank(query).await?;
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Rank against an already computed query embedding
    pub fn rank_embedding(&self, query: &[f32]) -> Result<Vec<ScoredDocument>> {
        if self.store.is_empty() {
            return Ok(Vec::new());
        }
        check_vector("query", query)?;

        let mut scored = Vec::with_capacity(self.embeddings.len());
        for (document, embedding) in self.store.documents().iter().zip(&self.embeddings) {
            let score = cosine_similarity(query, embedding).ok_or_else(|| {
                BuddyError::InvalidData(format!(
                    "query dimension {} does not match document dimension {}",
                    query.len(),
                    embedding.len()
                ))
            })?;
            scored.push(ScoredDocument {
                document: document.clone(),
                score,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.index.cmp(&b.document.index))
        });
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FixedEmbedder;
    use quickcheck_macros::quickcheck;

    fn ranker(vectors: Vec<Vec<f32>>) -> SimilarityRanker {
        let text: Vec<String> = (0..vectors.len()).map(|i| format!("doc {}", i)).collect();
        let store = DocumentStore::from_text(&text.join("\n\n"));
        SimilarityRanker::from_parts(store, vectors, Arc::new(FixedEmbedder::new())).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), Some(-1.0));
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[], &[]), None);
    }

    #[test]
    fn test_rank_orders_and_breaks_ties_by_index() {
        let ranker = ranker(vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 0.0]]);
        let ranked = ranker.rank_embedding(&[1.0, 0.0]).unwrap();
        let order: Vec<usize> = ranked.iter().map(|d| d.document.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_zero_norm_document_rejected() {
        let store = DocumentStore::from_text("a\n\nb");
        let result = SimilarityRanker::from_parts(
            store,
            vec![vec![1.0, 0.0], vec![0.0, 0.0]],
            Arc::new(FixedEmbedder::new()),
        );
        assert!(matches!(result, Err(BuddyError::InvalidData(_))));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let store = DocumentStore::from_text("a\n\nb");
        let result = SimilarityRanker::from_parts(
            store,
            vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
            Arc::new(FixedEmbedder::new()),
        );
        assert!(matches!(result, Err(BuddyError::InvalidData(_))));

        let ranker = ranker(vec![vec![1.0, 0.0]]);
        assert!(matches!(
            ranker.rank_embedding(&[1.0, 0.0, 0.0]),
            Err(BuddyError::InvalidData(_))
        ));
        assert!(matches!(ranker.rank_embedding(&[0.0, 0.0]), Err(BuddyError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_empty_store_skips_provider() {
        let embedder = Arc::new(FixedEmbedder::new());
        let ranker = SimilarityRanker::build(DocumentStore::default(), embedder.clone())
            .await
            .unwrap();
        assert!(ranker.rank("anything").await.unwrap().is_empty());
        assert_eq!(embedder.call_count(), 0);
        assert_eq!(ranker.dimension(), None);
    }

    #[tokio::test]
    async fn test_build_embeds_each_document_once() {
        let embedder = Arc::new(
            FixedEmbedder::new()
                .with("alpha", vec![1.0, 0.0])
                .with("beta", vec![0.0, 1.0])
                .with("query", vec![0.1, 0.9]),
        );
        let ranker = SimilarityRanker::build(DocumentStore::from_text("alpha\n\nbeta"), embedder.clone())
            .await
            .unwrap();
        assert_eq!(embedder.call_count(), 2);

        let top = ranker.top_k("query", 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].document.text, "beta");
        assert_eq!(embedder.call_count(), 3);
    }

    /// Scaling one document's embedding by a power of two never changes the order
    #[quickcheck]
    fn prop_rank_invariant_under_rescaling(raw: Vec<(i8, i8, i8)>, query: (i8, i8, i8), pick: usize, exp: u8) -> bool {
        let to_vec = |(a, b, c): (i8, i8, i8)| vec![a as f32, b as f32, c as f32];
        let vectors: Vec<Vec<f32>> = raw
            .into_iter()
            .map(to_vec)
            .filter(|v| v.iter().any(|x| *x != 0.0))
            .collect();
        let query = to_vec(query);
        if vectors.is_empty() || query.iter().all(|x| *x == 0.0) {
            return true;
        }

        let order = |vectors: Vec<Vec<f32>>| -> Vec<usize> {
            ranker(vectors)
                .rank_embedding(&query)
                .unwrap()
                .iter()
                .map(|d| d.document.index)
                .collect()
        };

        let mut scaled = vectors.clone();
        let factor = 2f32.powi((exp % 16) as i32 - 8);
        let target = pick % scaled.len();
        for x in scaled[target].iter_mut() {
            *x *= factor;
        }

        order(vectors) == order(scaled)
    }
}
