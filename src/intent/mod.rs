//! Intent mapping
//!
//! The model classifies a free-form request into a small JSON object; the
//! object is validated into an `Intent` that local code acts on. Parsing
//! failures are `ParseError`, and callers fall back to `Intent::Other`.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::errors::{BuddyError, Result};
use crate::ontology::Device;
use crate::providers::{GenerationOptions, GenerativeModel};

/// Prompt for the traffic domain
pub const TRAFFIC_INTENT_PROMPT: &str = r#"You are a traffic assistant agent.
Task: decide whether the user is asking about the violation status of a vehicle.
Reply only with JSON:
{
  "intent": "violation" or "other",
  "plate": "license plate, if any"
}
Examples:
- "ABC123 違規了嗎？" -> {"intent": "violation", "plate": "ABC123"}
- "Is XYZ789 in trouble?" -> {"intent": "violation", "plate": "XYZ789"}
- "How are you?" -> {"intent": "other", "plate": ""}"#;

/// Prompt for the home theater domain
pub const HOME_INTENT_PROMPT: &str = r#"You are a smart home assistant managing three home theater devices:
- light: status (on/off) and brightness (0-100)
- air_conditioner: mode (cool/heat/off) and temperature (°C)
- speaker: volume (0-100)

Reply only with JSON:
{
  "intent": "update" | "query" | "other",
  "device": "light" | "air_conditioner" | "speaker",
  "field": "status" | "brightness" | "mode" | "temperature" | "volume",
  "value": "string or number (for updates)",
  "comment": "short natural-language remark"
}"#;

/// Which intent vocabulary to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentDomain {
    Traffic,
    Home,
}

impl IntentDomain {
    pub fn prompt(&self) -> &'static str {
        match self {
            IntentDomain::Traffic => TRAFFIC_INTENT_PROMPT,
            IntentDomain::Home => HOME_INTENT_PROMPT,
        }
    }
}

/// Validated user intent
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Violation {
        plate: String,
    },
    HomeControl {
        device: Device,
        field: String,
        value: Value,
        comment: Option<String>,
    },
    HomeQuery {
        device: Device,
        comment: Option<String>,
    },
    Other {
        comment: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawIntent {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    plate: Option<String>,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    comment: Option<String>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// First `{...}` block, spanning lines
fn json_block(text: &str) -> Option<&str> {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK
        .get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("json block pattern is valid"))
        .find(text)
        .map(|m| m.as_str())
}

impl Intent {
    pub fn other() -> Self {
        Intent::Other { comment: None }
    }

    /// Parse and validate a model reply
    pub fn from_model_text(domain: IntentDomain, text: &str) -> Result<Self> {
        let block = json_block(text)
            .ok_or_else(|| BuddyError::ParseError("no JSON object in model reply".to_string()))?;
        let raw: RawIntent = serde_json::from_str(block)
            .map_err(|e| BuddyError::ParseError(format!("intent JSON: {}", e)))?;

        let label = non_empty(raw.intent).unwrap_or_else(|| "other".to_string());
        let comment = non_empty(raw.comment);

        match (domain, label.as_str()) {
            (_, "other") => Ok(Intent::Other { comment }),
            (IntentDomain::Traffic, "violation") => {
                let plate = non_empty(raw.plate)
                    .ok_or_else(|| BuddyError::ParseError("violation intent without plate".to_string()))?;
                Ok(Intent::Violation { plate })
            }
            (IntentDomain::Home, "update") => {
                let device: Device = non_empty(raw.device)
                    .ok_or_else(|| BuddyError::ParseError("update intent without device".to_string()))?
                    .parse()?;
                let field = non_empty(raw.field)
                    .ok_or_else(|| BuddyError::ParseError("update intent without field".to_string()))?;
                if !device.has_field(&field) {
                    return Err(BuddyError::ParseError(format!("{} has no field '{}'", device, field)));
                }
                let value = raw
                    .value
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| BuddyError::ParseError("update intent without value".to_string()))?;
                Ok(Intent::HomeControl {
                    device,
                    field,
                    value,
                    comment,
                })
            }
            (IntentDomain::Home, "query") => {
                let device: Device = non_empty(raw.device)
                    .ok_or_else(|| BuddyError::ParseError("query intent without device".to_string()))?
                    .parse()?;
                Ok(Intent::HomeQuery { device, comment })
            }
            (_, other) => Err(BuddyError::ParseError(format!("unexpected intent '{}'", other))),
        }
    }
}

/// Asks the model to classify user input
pub struct IntentParser {
    model: Arc<dyn GenerativeModel>,
    domain: IntentDomain,
}

impl IntentParser {
    pub fn new(model: Arc<dyn GenerativeModel>, domain: IntentDomain) -> Self {
        Self { model, domain }
    }

    pub fn domain(&self) -> IntentDomain {
        self.domain
    }

    /// Classify input; errors are returned as-is
    pub async fn parse(&self, input: &str) -> Result<Intent> {
        let prompt = format!("{}\nUser: {}", self.domain.prompt(), input);
        let reply = self.model.complete(&prompt, GenerationOptions::default()).await?;
        debug!(reply = %reply, "intent reply");
        Intent::from_model_text(self.domain, &reply)
    }

    /// Classify input, treating parse and provider failures as `Other`
    pub async fn parse_or_other(&self, input: &str) -> Intent {
        match self.parse(input).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "intent parsing failed, treating as other");
                Intent::other()
            }
        }
    }
}
