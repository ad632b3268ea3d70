//! Gemini REST client
//!
//! Endpoints:
//! - POST /v1beta/models/{model}:generateContent
//! - POST /v1beta/models/{model}:embedContent
//! - GET  /v1beta/models

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::errors::{BuddyError, Result};
use crate::providers::types::{
    Content, Embedding, GenerateRequest, GenerationOptions, ModelTurn, Part,
};
use crate::providers::{EmbeddingProvider, GenerativeModel};
use crate::tools::types::ToolSchema;

/// Default API endpoint
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default generation model
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Request timeout (60 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl GeminiClient {
    /// Create client with default endpoint and models
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(
            DEFAULT_API_BASE,
            api_key,
            DEFAULT_CHAT_MODEL,
            DEFAULT_EMBEDDING_MODEL,
            REQUEST_TIMEOUT,
        )
    }

    /// Create client with custom configuration
    pub fn with_config(
        api_base: &str,
        api_key: impl Into<String>,
        chat_model: &str,
        embedding_model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(BuddyError::ConfigError("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BuddyError::HttpError)?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            chat_model: strip_models_prefix(chat_model).to_string(),
            embedding_model: strip_models_prefix(embedding_model).to_string(),
        })
    }

    /// Generation model name
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// Embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api_base, model, method)
    }

    async fn post_json<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| BuddyError::ProviderError(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BuddyError::ProviderError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BuddyError::ProviderError(format!("Failed to parse response: {}", e)))
    }

    /// List models that support `generateContent`
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models", self.api_base);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", "100")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| BuddyError::ProviderError(format!("Failed to list models: {}", e)))?;

            if !response.status().is_success() {
                return Err(BuddyError::ProviderError(format!(
                    "Failed to retrieve model list: HTTP {}",
                    response.status()
                )));
            }

            let page: ModelsResponse = response
                .json()
                .await
                .map_err(|e| BuddyError::ProviderError(format!("Failed to parse models: {}", e)))?;

            names.extend(
                page.models
                    .into_iter()
                    .filter(|m| {
                        m.supported_generation_methods
                            .iter()
                            .any(|method| method == "generateContent")
                    })
                    .map(|m| m.name),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelTurn> {
        debug!(
            model = %self.chat_model,
            contents = request.contents.len(),
            tools = request.tools.len(),
            "generateContent"
        );

        let body = serde_json::to_value(GenerateContentBody::from_request(request))?;
        let url = self.model_url(&self.chat_model, "generateContent");
        let response: GenerateContentResponse = self.post_json(&url, &body).await?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            BuddyError::ProviderError(match response.prompt_feedback {
                Some(feedback) => format!("No candidates returned (feedback: {})", feedback),
                None => "No candidates returned".to_string(),
            })
        })?;

        match candidate.content {
            Some(content) => Ok(content),
            None => Err(BuddyError::ProviderError(format!(
                "Candidate has no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!(model = %self.embedding_model, chars = text.chars().count(), "embedContent");

        let body = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] }
        });
        let url = self.model_url(&self.embedding_model, "embedContent");
        let response: EmbedContentResponse = self.post_json(&url, &body).await?;

        Ok(response.embedding.values)
    }
}

fn strip_models_prefix(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationOptions>,
}

impl<'a> GenerateContentBody<'a> {
    fn from_request(request: &'a GenerateRequest) -> Self {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![ToolDeclarations {
                function_declarations: request
                    .tools
                    .iter()
                    .map(FunctionDeclaration::from_schema)
                    .collect(),
            }]
        };

        Self {
            system_instruction: request.system_instruction.as_ref().map(|text| {
                SystemInstruction {
                    parts: vec![Part::text(text.clone())],
                }
            }),
            contents: &request.contents,
            tools,
            generation_config: request
                .options
                .temperature
                .map(|_| request.options),
        }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations<'a> {
    function_declarations: Vec<FunctionDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    // The API rejects object schemas with no properties
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a Value>,
}

impl<'a> FunctionDeclaration<'a> {
    fn from_schema(schema: &'a ToolSchema) -> Self {
        Self {
            name: &schema.name,
            description: &schema.description,
            parameters: schema.has_parameters().then_some(&schema.parameters),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::FunctionCall;

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new("test-key").unwrap();
        assert_eq!(client.chat_model(), DEFAULT_CHAT_MODEL);
        assert_eq!(client.embedding_model(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(client.api_base(), DEFAULT_API_BASE);
    }

    #[test]
    fn test_empty_key_is_config_error() {
        let result = GeminiClient::new("   ");
        assert!(matches!(result, Err(BuddyError::ConfigError(_))));
    }

    #[test]
    fn test_models_prefix_stripped() {
        let client = GeminiClient::with_config(
            "http://localhost:8080/",
            "k",
            "models/gemini-2.0-flash",
            "models/text-embedding-004",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.chat_model(), "gemini-2.0-flash");
        assert_eq!(
            client.model_url("gemini-2.0-flash", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = GeminiClient::new("super-secret").unwrap();
        let printed = format!("{:?}", client);
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            system_instruction: Some("You are a traffic assistant.".to_string()),
            contents: vec![Content::user("Is ABC123 in violation?")],
            tools: vec![
                ToolSchema::new(
                    "query_ontology",
                    "Look up a vehicle",
                    json!({
                        "type": "object",
                        "properties": {"plate": {"type": "string"}},
                        "required": ["plate"]
                    }),
                ),
                ToolSchema::new(
                    "turn_on_light",
                    "Turn the light on",
                    json!({"type": "object", "properties": {}}),
                ),
            ],
            options: GenerationOptions::with_temperature(0.2),
        };

        let body = serde_json::to_value(GenerateContentBody::from_request(&request)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a traffic assistant.");
        assert_eq!(body["contents"][0]["role"], "user");
        let decls = &body["tools"][0]["functionDeclarations"];
        assert_eq!(decls[0]["name"], "query_ontology");
        assert_eq!(decls[0]["parameters"]["required"][0], "plate");
        assert!(decls[1].get("parameters").is_none());
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_request_body_omits_empty_sections() {
        let request = GenerateRequest::prompt("hello", GenerationOptions::default());
        let body = serde_json::to_value(GenerateContentBody::from_request(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_parsing_with_function_call() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "save_pet_info", "args": {"name": "Rex"}}}]
                },
                "finishReason": "STOP"
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let content = response.candidates[0].content.as_ref().unwrap();
        assert_eq!(
            content.function_calls()[0],
            &FunctionCall::new("save_pet_info", json!({"name": "Rex"}))
        );
    }

    #[test]
    fn test_thought_signature_survives_the_next_request() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {"name": "get_pet_name", "args": {}},
                        "thoughtSignature": "c2lnbmF0dXJl"
                    }]
                }
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let turn = response.candidates.into_iter().next().unwrap().content.unwrap();

        let request = GenerateRequest {
            system_instruction: None,
            contents: vec![Content::user("What is my dog's name?"), turn],
            tools: Vec::new(),
            options: GenerationOptions::default(),
        };
        let body = serde_json::to_value(GenerateContentBody::from_request(&request)).unwrap();
        assert_eq!(body["contents"][1]["parts"][0]["thoughtSignature"], "c2lnbmF0dXJl");
    }

    #[test]
    fn test_models_response_parsing() {
        let raw = json!({
            "models": [
                {"name": "models/gemini-2.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}
            ]
        });
        let response: ModelsResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.models.len(), 2);
        assert!(response.next_page_token.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires GEMINI_API_KEY and network access
    async fn test_generate_integration() {
        let key = std::env::var("GEMINI_API_KEY").unwrap();
        let client = GeminiClient::new(key).unwrap();
        let text = client
            .complete("Reply with the word pong.", GenerationOptions::with_temperature(0.0))
            .await
            .unwrap();
        assert!(!text.is_empty());
    }
}
