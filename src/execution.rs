//! Shared scenario logic for one-shot CLI runs and REPL sessions
//!
//! Turns an interpreted request into an action on a local store and a
//! message for the user. Nothing here prints.

use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::errors::{BuddyError, Result};
use crate::intent::{Intent, IntentParser};
use crate::ontology::{extract_plate, AgentState, HomeTheaterStore, OntologyStore, ViolationCheck};
use crate::providers::{GenerationOptions, GenerativeModel};

/// Instructions placed ahead of the facts in a facts-mode prompt
pub const FACTS_SYSTEM_PROMPT: &str = "You are a traffic assistant agent.
You will receive ontology facts and a user question.
Reason about the facts and rules, then answer naturally in Traditional Chinese.";

/// Result of checking a plate against the expired-license rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrafficAnswer {
    /// No plate in the question
    NoPlate,
    /// Not a traffic question
    OffTopic,
    Checked { plate: String, check: ViolationCheck },
}

impl fmt::Display for TrafficAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficAnswer::NoPlate => write!(f, "Please include a valid plate number (e.g. ABC123)."),
            TrafficAnswer::OffTopic => write!(f, "That does not look like a traffic question."),
            TrafficAnswer::Checked { plate, check } => match check {
                ViolationCheck::Violation => {
                    write!(f, "Plate {} has an expired license and is in violation.", plate)
                }
                ViolationCheck::Compliant => {
                    write!(f, "Plate {} has a valid license, no violation.", plate)
                }
                ViolationCheck::UnknownPlate => write!(f, "Plate {} was not found.", plate),
            },
        }
    }
}

/// Rule-based lookup: the first plate-like token in the question
pub fn lookup_violation(store: &OntologyStore, question: &str) -> Result<TrafficAnswer> {
    let Some(plate) = extract_plate(question) else {
        return Ok(TrafficAnswer::NoPlate);
    };
    let check = store.check_violation(plate)?;
    Ok(TrafficAnswer::Checked {
        plate: plate.to_string(),
        check,
    })
}

/// Model-mapped lookup: only a violation intent touches the store
pub async fn traffic_intent_turn(
    parser: &IntentParser,
    store: &OntologyStore,
    question: &str,
) -> Result<TrafficAnswer> {
    match parser.parse_or_other(question).await {
        Intent::Violation { plate } => {
            let check = store.check_violation(&plate)?;
            Ok(TrafficAnswer::Checked { plate, check })
        }
        _ => Ok(TrafficAnswer::OffTopic),
    }
}

/// Prompt carrying the ontology facts and the question in one message
pub fn facts_prompt(question: &str, facts: &[String]) -> String {
    format!(
        "{}\n\nOntology facts:\n{}\n\nUser question: {}",
        FACTS_SYSTEM_PROMPT,
        facts.join("\n"),
        question
    )
}

/// Look up the plate's facts locally and let the model reason over them
///
/// Questions without a plate are answered without a model call.
pub async fn facts_turn(model: &dyn GenerativeModel, store: &OntologyStore, question: &str) -> Result<String> {
    let Some(plate) = extract_plate(question) else {
        return Ok(TrafficAnswer::NoPlate.to_string());
    };

    let ontology = store.load()?;
    let mut facts: Vec<String> = match ontology.vehicle_facts(plate) {
        Some(facts) => facts.iter().map(ToString::to_string).collect(),
        None => vec![format!("Vehicle {} not found in ontology.", plate)],
    };
    for (name, rule) in &ontology.rules {
        let rule = match rule.as_str() {
            Some(text) => text.to_string(),
            None => serde_yaml::to_string(rule)?.trim().to_string(),
        };
        facts.push(format!("(rule, {}, {})", name, rule));
    }

    let answer = model.complete(&facts_prompt(question, &facts), GenerationOptions::default()).await?;
    Ok(answer.trim().to_string())
}

/// Outcome of one home assistant turn
#[derive(Debug, Clone, PartialEq)]
pub struct HomeTurn {
    pub state: AgentState,
    pub message: String,
    /// Device state after an update, or the queried state
    pub device_state: Option<Value>,
}

/// Interpret one request and act on the home theater store
pub async fn home_turn(parser: &IntentParser, store: &HomeTheaterStore, input: &str) -> Result<HomeTurn> {
    match parser.parse_or_other(input).await {
        Intent::HomeControl {
            device,
            field,
            value,
            comment,
        } => match store.apply(device, &field, &value) {
            Ok(state) => Ok(HomeTurn {
                state: AgentState::Updating,
                message: comment.unwrap_or_else(|| format!("Updated {}.{} → {}", device, field, value)),
                device_state: Some(state),
            }),
            Err(BuddyError::ParseError(reason)) => {
                warn!(%device, %field, %reason, "rejected device update");
                Ok(HomeTurn {
                    state: AgentState::Discussing,
                    message: format!("Cannot set {}.{}: {}", device, field, reason),
                    device_state: None,
                })
            }
            Err(e) => Err(e),
        },
        Intent::HomeQuery { device, comment } => Ok(HomeTurn {
            state: AgentState::Querying,
            message: comment.unwrap_or_else(|| format!("Current {} settings.", device)),
            device_state: Some(store.device_state(device)?),
        }),
        Intent::Other { comment: Some(comment) } => Ok(HomeTurn {
            state: AgentState::Discussing,
            message: comment,
            device_state: None,
        }),
        _ => Ok(HomeTurn {
            state: AgentState::Discussing,
            message: "Let's keep talking about your home theater setup.".to_string(),
            device_state: None,
        }),
    }
}
