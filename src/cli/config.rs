//! Configuration management for GeminiBuddy
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.geminibuddy/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{BuddyError, Result};
use crate::providers::gemini::{DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use crate::providers::GeminiClient;
use crate::rag::context::{ContextConfig, DEFAULT_ANSWER_LANGUAGE, DEFAULT_ANSWER_TEMPERATURE};
use crate::rag::reranking::DEFAULT_RERANK_CONCURRENCY;
use crate::rag::retrieval::{DEFAULT_CANDIDATE_K, DEFAULT_TOP_K};
use crate::rag::RagConfig;
use crate::tools::DEFAULT_MAX_TOOL_ROUNDS;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Complete configuration for GeminiBuddy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub rag: RagSection,
    pub tools: ToolsConfig,
    pub paths: PathsConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_base: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

/// Retrieval configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSection {
    pub faq_path: String,
    pub top_k: usize,
    pub candidate_k: usize,
    pub rerank: bool,
    pub rerank_concurrency: usize,
    pub answer_temperature: f32,
    pub answer_language: String,
}

/// Tool calling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub max_tool_rounds: usize,
}

/// File system paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub ontology: String,
    pub home_theater: String,
    pub history_file: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for RagSection {
    fn default() -> Self {
        Self {
            faq_path: "faq.txt".to_string(),
            top_k: DEFAULT_TOP_K,
            candidate_k: DEFAULT_CANDIDATE_K,
            rerank: true,
            rerank_concurrency: DEFAULT_RERANK_CONCURRENCY,
            answer_temperature: DEFAULT_ANSWER_TEMPERATURE,
            answer_language: DEFAULT_ANSWER_LANGUAGE.to_string(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ontology: "ontology.yaml".to_string(),
            home_theater: "home_theater.yaml".to_string(),
            history_file: "~/.geminibuddy/history.txt".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BuddyError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| BuddyError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        match dirs::home_dir() {
            Some(home) => Self::load_or_create(&home.join(".geminibuddy").join("config.toml")),
            None => Ok(Config::default()),
        }
    }

    /// Load configuration, writing the defaults first when the file is missing
    ///
    /// A default file that cannot be written is logged and the defaults are
    /// used anyway.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from_file(path);
        }

        let config = Config::default();
        match config.save(path) {
            Ok(()) => debug!(path = %path.display(), "wrote default config"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not write default config"),
        }
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.gemini.chat_model.trim().is_empty() || self.gemini.embedding_model.trim().is_empty() {
            return Err(BuddyError::ConfigError("model names must not be empty".to_string()));
        }

        if self.gemini.timeout_secs == 0 {
            return Err(BuddyError::ConfigError(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.rag_config().validate()?;

        if self.tools.max_tool_rounds == 0 {
            return Err(BuddyError::ConfigError(
                "max_tool_rounds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BuddyError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BuddyError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| BuddyError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Retrieval pipeline settings
    pub fn rag_config(&self) -> RagConfig {
        RagConfig {
            top_k: self.rag.top_k,
            candidate_k: self.rag.candidate_k,
            rerank: self.rag.rerank,
            rerank_concurrency: self.rag.rerank_concurrency,
            context: ContextConfig {
                answer_language: self.rag.answer_language.clone(),
                temperature: self.rag.answer_temperature,
            },
        }
    }

    /// Retrieval settings with command-line overrides, validated again
    pub fn rag_config_with(&self, top_k: Option<usize>, no_rerank: bool) -> Result<RagConfig> {
        let mut config = self.rag_config();
        if let Some(k) = top_k {
            config.top_k = k;
        }
        if no_rerank {
            config.rerank = false;
        }
        config.validate()?;
        Ok(config)
    }

    /// Build the API client for this configuration
    pub fn gemini_client(&self, api_key: String) -> Result<GeminiClient> {
        GeminiClient::with_config(
            &self.gemini.api_base,
            api_key,
            &self.gemini.chat_model,
            &self.gemini.embedding_model,
            Duration::from_secs(self.gemini.timeout_secs),
        )
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn faq_path(&self) -> PathBuf {
        Self::expand_path(&self.rag.faq_path)
    }

    pub fn ontology_path(&self) -> PathBuf {
        Self::expand_path(&self.paths.ontology)
    }

    pub fn home_theater_path(&self) -> PathBuf {
        Self::expand_path(&self.paths.home_theater)
    }

    pub fn history_path(&self) -> PathBuf {
        Self::expand_path(&self.paths.history_file)
    }
}

/// Read the API key from the environment, after loading `.env` if present
pub fn load_api_key() -> Result<String> {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();
    api_key_from(std::env::var(API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<String> {
    value
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            BuddyError::ConfigError(format!(
                "{} is not set; add it to your environment or a .env file",
                API_KEY_VAR
            ))
        })
}
