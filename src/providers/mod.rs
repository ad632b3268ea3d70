//! Remote model providers
//!
//! Every remote call goes through one of two traits so the retrieval
//! pipeline and the tool dispatcher can run against test doubles:
//! - `EmbeddingProvider`: text to vector
//! - `GenerativeModel`: conversation to text or function calls

pub mod gemini;
pub mod stub;
pub mod types;

use async_trait::async_trait;

use crate::errors::Result;

pub use gemini::GeminiClient;
pub use stub::{FixedEmbedder, ScriptedModel};
pub use types::{
    Content, Embedding, FunctionCall, FunctionResponse, GenerateRequest, GenerationOptions,
    ModelTurn, Part, Role,
};

/// Maps text to a fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Generates a reply, or function calls when tools are declared
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelTurn>;

    /// Single prompt in, text out
    async fn complete(&self, prompt: &str, options: GenerationOptions) -> Result<String> {
        let request = GenerateRequest::prompt(prompt, options);
        let turn = self.generate(&request).await?;
        Ok(turn.text())
    }
}
