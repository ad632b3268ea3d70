//! Deterministic providers for tests and offline runs
//!
//! `FixedEmbedder` returns hand-crafted vectors, `ScriptedModel` replays
//! queued turns or answers through a responder closure.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::errors::{BuddyError, Result};
use crate::providers::types::{Content, Embedding, GenerateRequest, ModelTurn, Part, Role};
use crate::providers::{EmbeddingProvider, GenerativeModel};
use crate::providers::types::FunctionCall;

/// Embedding provider backed by a fixed text → vector table
#[derive(Debug, Default)]
pub struct FixedEmbedder {
    vectors: HashMap<String, Embedding>,
    calls: Mutex<usize>,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the vector returned for `text` (matched after trimming)
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.trim().to_string(), vector);
        self
    }

    /// Number of embed calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        self.vectors
            .get(text.trim())
            .cloned()
            .ok_or_else(|| BuddyError::ProviderError(format!("no fixture embedding for {:?}", text)))
    }
}

type Responder = Box<dyn Fn(&GenerateRequest) -> Result<ModelTurn> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<Result<ModelTurn>>>),
    Responder(Responder),
}

/// Generative model double
pub struct ScriptedModel {
    script: Script,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl std::fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("requests", &self.request_count())
            .finish()
    }
}

impl ScriptedModel {
    /// Replay `turns` in order; an exhausted queue is a provider error
    pub fn new(turns: Vec<Result<ModelTurn>>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(turns.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request through `responder`
    pub fn responder<F>(responder: F) -> Self
    where
        F: Fn(&GenerateRequest) -> Result<ModelTurn> + Send + Sync + 'static,
    {
        Self {
            script: Script::Responder(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay plain text replies
    pub fn texts<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(Content::model(r))).collect())
    }

    /// Model turn requesting the given calls
    pub fn call_turn(calls: Vec<FunctionCall>) -> ModelTurn {
        Content {
            role: Role::Model,
            parts: calls.into_iter().map(Part::function_call).collect(),
        }
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelTurn> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .map_err(|_| BuddyError::Generic("scripted queue poisoned".to_string()))?
                .pop_front()
                .unwrap_or_else(|| {
                    Err(BuddyError::ProviderError("script exhausted".to_string()))
                }),
            Script::Responder(responder) => responder(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::GenerationOptions;

    #[tokio::test]
    async fn test_fixed_embedder_lookup() {
        let embedder = FixedEmbedder::new().with("hello", vec![1.0, 0.0]);
        assert_eq!(embedder.embed("  hello ").await.unwrap(), vec![1.0, 0.0]);
        assert!(embedder.embed("unknown").await.is_err());
        assert_eq!(embedder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_queue_order() {
        let model = ScriptedModel::texts(["first", "second"]);
        let options = GenerationOptions::default();
        assert_eq!(model.complete("a", options).await.unwrap(), "first");
        assert_eq!(model.complete("b", options).await.unwrap(), "second");
        assert!(matches!(
            model.complete("c", options).await,
            Err(BuddyError::ProviderError(_))
        ));
        assert_eq!(model.request_count(), 3);
    }

    #[test]
    fn test_call_turn_is_model_role() {
        let turn = ScriptedModel::call_turn(vec![FunctionCall::new("get_pet_name", serde_json::json!({}))]);
        let model = ScriptedModel::new(vec![Ok(turn)]);
        let request = GenerateRequest::prompt("what's my dog called?", GenerationOptions::default());
        let turn = tokio_test::block_on(model.generate(&request)).unwrap();
        assert_eq!(turn.role, Role::Model);
        assert!(turn.has_function_calls());
        assert_eq!(turn.text(), "");
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let model = ScriptedModel::responder(|req| {
            let prompt = req.last_user_text().unwrap_or_default();
            Ok(Content::model(prompt.to_uppercase()))
        });
        let reply = model.complete("ping", GenerationOptions::default()).await.unwrap();
        assert_eq!(reply, "PING");
    }
}
