//! Integration tests for FAQ retrieval
//!
//! Runs the full load → embed → rank → rerank → answer flow against
//! deterministic providers.

use std::sync::Arc;

use geminibuddy::providers::{Content, FixedEmbedder, ScriptedModel};
use geminibuddy::rag::{DocumentStore, RagConfig, RagPipeline, SimilarityRanker};
use tempfile::TempDir;

const FAQ: &str = "Q: How long does shipping take?\nA: Orders ship within 3 business days.

Q: Can I return an item?
A: Returns are accepted within 7 days.

Q: Which payment methods do you accept?
A: Credit cards and bank transfer.
";

fn embedder() -> Arc<FixedEmbedder> {
    Arc::new(
        FixedEmbedder::new()
            .with(
                "Q: How long does shipping take?\nA: Orders ship within 3 business days.",
                vec![0.9, 0.1, 0.0],
            )
            .with("Q: Can I return an item?\nA: Returns are accepted within 7 days.", vec![0.1, 0.9, 0.1])
            .with(
                "Q: Which payment methods do you accept?\nA: Credit cards and bank transfer.",
                vec![0.0, 0.2, 0.9],
            )
            .with("When will my package arrive?", vec![1.0, 0.05, 0.0]),
    )
}

async fn ranker_from_file(dir: &TempDir) -> SimilarityRanker {
    let path = dir.path().join("faq.txt");
    std::fs::write(&path, FAQ).unwrap();
    let store = DocumentStore::load(&path).unwrap();
    assert_eq!(store.len(), 3);
    SimilarityRanker::build(store, embedder()).await.unwrap()
}

#[tokio::test]
async fn test_shipping_question_selects_shipping_entry() {
    let dir = TempDir::new().unwrap();
    let ranker = ranker_from_file(&dir).await;

    let top = ranker.top_k("When will my package arrive?", 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert!(top[0].document.text.contains("ship within 3 business days"));
}

#[tokio::test]
async fn test_stored_text_ranks_itself_first() {
    let dir = TempDir::new().unwrap();
    let ranker = ranker_from_file(&dir).await;

    let query = "Q: Can I return an item?\nA: Returns are accepted within 7 days.";
    let ranked = ranker.rank(query).await.unwrap();
    assert_eq!(ranked[0].document.index, 1);
    assert!((ranked[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_two_stage_answer_is_grounded_in_reranked_passage() {
    let dir = TempDir::new().unwrap();
    let ranker = ranker_from_file(&dir).await;

    let model = Arc::new(ScriptedModel::responder(|request| {
        let prompt = request.last_user_text().unwrap_or_default();
        if prompt.starts_with("Rate how relevant") {
            let score = if prompt.contains("shipping") { "分數：90" } else { "15" };
            Ok(Content::model(score))
        } else {
            Ok(Content::model("大約三個工作天內出貨。"))
        }
    }));
    let config = RagConfig {
        top_k: 1,
        candidate_k: 3,
        ..Default::default()
    };
    let pipeline = RagPipeline::new(ranker, model.clone(), config);

    let answer = pipeline.answer("When will my package arrive?").await.unwrap();
    assert_eq!(answer.answer, "大約三個工作天內出貨。");
    assert_eq!(answer.sources().len(), 1);
    assert_eq!(answer.sources()[0].document.index, 0);
    assert_eq!(answer.sources()[0].rerank_score, Some(90.0));
    assert!(answer.prompt.contains("[Source 1]"));
    assert!(answer.prompt.contains("Traditional Chinese"));

    // three rerank calls plus the answer
    assert_eq!(model.request_count(), 4);
}

#[tokio::test]
async fn test_failed_rerank_call_keeps_candidate() {
    let dir = TempDir::new().unwrap();
    let ranker = ranker_from_file(&dir).await;

    let model = Arc::new(ScriptedModel::responder(|request| {
        let prompt = request.last_user_text().unwrap_or_default();
        if prompt.contains("payment") {
            Err(geminibuddy::BuddyError::ProviderError("503".to_string()))
        } else if prompt.starts_with("Rate how relevant") {
            Ok(Content::model("40"))
        } else {
            Ok(Content::model("ok"))
        }
    }));
    let config = RagConfig {
        top_k: 3,
        candidate_k: 3,
        ..Default::default()
    };
    let pipeline = RagPipeline::new(ranker, model, config);

    let retrieval = pipeline.retrieve("When will my package arrive?").await.unwrap();
    assert_eq!(retrieval.passages.len(), 3);
    let failed = retrieval
        .passages
        .iter()
        .find(|p| p.document.text.contains("payment"))
        .unwrap();
    assert_eq!(failed.rerank_score, Some(0.0));
}
