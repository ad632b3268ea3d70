//! Meeting recap
//!
//! Turns a transcript into `{meet_topic, meeting_participants, recap}` JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{BuddyError, Result};
use crate::providers::{GenerationOptions, GenerativeModel};

/// Default output file
pub const DEFAULT_RECAP_OUTPUT: &str = "output.json";

/// Participants may come back as a list or as one string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Participants {
    List(Vec<String>),
    Text(String),
}

impl Participants {
    pub fn names(&self) -> Vec<String> {
        match self {
            Participants::List(names) => names.clone(),
            Participants::Text(text) => text
                .split([',', '、', '，'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecap {
    pub meet_topic: String,
    pub meeting_participants: Participants,
    pub recap: String,
}

impl MeetingRecap {
    /// Parse a model reply, tolerating ``` fences around the JSON
    pub fn from_model_text(text: &str) -> Result<Self> {
        let cleaned = text.trim().replace("```json", "").replace("```", "");
        serde_json::from_str(cleaned.trim())
            .map_err(|e| BuddyError::ParseError(format!("recap is not valid JSON: {}", e)))
    }

    /// Write pretty-printed JSON
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "recap written");
        Ok(())
    }
}

pub fn recap_prompt(transcript: &str) -> String {
    format!(
        "You are a meeting assistant. Summarise the transcript below as JSON with these fields:\n\
         - meet_topic: the meeting topic\n\
         - meeting_participants: the participants\n\
         - recap: the meeting summary\n\n\
         Output pure JSON only, without any extra text, comments or code fences.\n\n\
         Transcript:\n{}",
        transcript
    )
}

/// Outcome of a recap request; the raw reply is kept when it is not JSON
#[derive(Debug, Clone, PartialEq)]
pub enum RecapOutcome {
    Parsed(MeetingRecap),
    Unparsed { raw: String, error: String },
}

pub struct MeetingRecapper {
    model: Arc<dyn GenerativeModel>,
}

impl MeetingRecapper {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn summarise(&self, transcript: &str) -> Result<RecapOutcome> {
        let reply = self
            .model
            .complete(&recap_prompt(transcript), GenerationOptions::default())
            .await?;
        debug!(chars = reply.len(), "recap reply received");

        Ok(match MeetingRecap::from_model_text(&reply) {
            Ok(recap) => RecapOutcome::Parsed(recap),
            Err(e) => RecapOutcome::Unparsed {
                raw: reply,
                error: e.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedModel;
    use tempfile::TempDir;

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"meet_topic\": \"Q3 budget\", \"meeting_participants\": [\"Amy\", \"Ben\"], \"recap\": \"Budget approved\"}\n```";
        let recap = MeetingRecap::from_model_text(text).unwrap();
        assert_eq!(recap.meet_topic, "Q3 budget");
        assert_eq!(recap.meeting_participants.names(), vec!["Amy", "Ben"]);
    }

    #[test]
    fn test_participants_as_string() {
        let text = r#"{"meet_topic": "t", "meeting_participants": "Amy、Ben, Cat", "recap": "r"}"#;
        let recap = MeetingRecap::from_model_text(text).unwrap();
        assert_eq!(recap.meeting_participants.names(), vec!["Amy", "Ben", "Cat"]);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            MeetingRecap::from_model_text("Here is your summary: ..."),
            Err(BuddyError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_summarise_and_write() {
        let model = Arc::new(ScriptedModel::texts([
            r#"{"meet_topic": "Launch", "meeting_participants": ["Amy"], "recap": "Ship it"}"#,
        ]));
        let outcome = MeetingRecapper::new(model).summarise("Amy: ship it").await.unwrap();
        let RecapOutcome::Parsed(recap) = outcome else {
            panic!("expected parsed recap");
        };

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_RECAP_OUTPUT);
        recap.write_to(&path).unwrap();
        let written: MeetingRecap = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, recap);
    }

    #[tokio::test]
    async fn test_summarise_keeps_raw_text() {
        let model = Arc::new(ScriptedModel::texts(["not json"]));
        let outcome = MeetingRecapper::new(model).summarise("...").await.unwrap();
        assert!(matches!(outcome, RecapOutcome::Unparsed { raw, .. } if raw == "not json"));
    }
}
