//! Tool-calling dispatcher
//!
//! Drives one user turn through the model:
//!
//! ```text
//! AwaitingModelTurn --model replies--------> Replied (terminal)
//!        ^          --model requests tools--> ToolsRequested
//!        |                                        |
//!        +------ results fed back to model -------+
//! ```
//!
//! Every call of a model turn is executed, in order, and all results go
//! back in a single message. Unknown names and missing required arguments
//! produce an error payload without invoking anything.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{BuddyError, Result};
use crate::providers::types::{Content, FunctionCall, GenerateRequest, GenerationOptions, Part, Role};
use crate::providers::GenerativeModel;
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{ToolResult, ToolStats};

/// Default limit of tool rounds within one user turn
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 3;

/// Dispatcher state within one user turn
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchState {
    AwaitingModelTurn,
    ToolsRequested(Vec<FunctionCall>),
    Replied(String),
}

/// A call the model made and what it got back
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub call: FunctionCall,
    pub result: ToolResult,
}

/// Outcome of one user turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Final natural-language reply
    pub reply: String,
    /// Tools executed during the turn, in execution order
    pub invocations: Vec<ToolInvocation>,
    /// Number of tool rounds
    pub tool_rounds: usize,
}

impl TurnReport {
    pub fn used_tools(&self) -> bool {
        !self.invocations.is_empty()
    }
}

/// Multi-turn chat with local tool execution
pub struct ToolDispatcher<C> {
    model: Arc<dyn GenerativeModel>,
    registry: ToolRegistry<C>,
    system_instruction: Option<String>,
    options: GenerationOptions,
    history: Vec<Content>,
    max_tool_rounds: usize,
    stats: ToolStats,
}

impl<C> ToolDispatcher<C> {
    /// Create dispatcher over a model and a tool registry
    pub fn new(model: Arc<dyn GenerativeModel>, registry: ToolRegistry<C>) -> Self {
        Self {
            model,
            registry,
            system_instruction: None,
            options: GenerationOptions::default(),
            history: Vec::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            stats: ToolStats::default(),
        }
    }

    /// Set system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set generation options
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set tool round limit (at least 1)
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    /// Send a user message and run it to a final reply
    ///
    /// On error the history is rolled back to where it was before the
    /// message; local side effects that already ran are kept.
    pub async fn send(&mut self, context: &mut C, message: &str) -> Result<TurnReport> {
        let checkpoint = self.history.len();
        self.history.push(Content::user(message));

        match self.run_turn(context).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.history.truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_turn(&mut self, context: &mut C) -> Result<TurnReport> {
        let mut invocations = Vec::new();
        let mut rounds = 0;
        let mut state = DispatchState::AwaitingModelTurn;

        loop {
            state = match state {
                DispatchState::AwaitingModelTurn => {
                    let turn = self.next_model_turn().await?;
                    let calls: Vec<FunctionCall> =
                        turn.function_calls().into_iter().cloned().collect();
                    let text = turn.text();
                    self.history.push(turn);

                    if calls.is_empty() {
                        DispatchState::Replied(text)
                    } else {
                        DispatchState::ToolsRequested(calls)
                    }
                }
                DispatchState::ToolsRequested(calls) => {
                    rounds += 1;
                    if rounds > self.max_tool_rounds {
                        return Err(BuddyError::ProviderError(format!(
                            "model still requesting tools after {} rounds",
                            self.max_tool_rounds
                        )));
                    }

                    let mut parts = Vec::with_capacity(calls.len());
                    for call in calls {
                        let result = self.execute_call(&call, context);
                        parts.push(Part::function_response(call.name.clone(), result.output.clone()));
                        invocations.push(ToolInvocation { call, result });
                    }
                    self.history.push(Content {
                        role: Role::User,
                        parts,
                    });

                    DispatchState::AwaitingModelTurn
                }
                DispatchState::Replied(reply) => {
                    return Ok(TurnReport {
                        reply,
                        invocations,
                        tool_rounds: rounds,
                    });
                }
            };
        }
    }

    async fn next_model_turn(&self) -> Result<Content> {
        let request = GenerateRequest {
            system_instruction: self.system_instruction.clone(),
            contents: self.history.clone(),
            tools: self.registry.schemas(),
            options: self.options,
        };
        debug!(history = request.contents.len(), "awaiting model turn");
        self.model.generate(&request).await
    }

    /// Execute one requested call against the registry
    pub fn execute_call(&mut self, call: &FunctionCall, context: &mut C) -> ToolResult {
        let start = Instant::now();
        let args = Value::Object(call.args.clone());
        info!(tool = %call.name, %args, "model requested tool");

        let missing = self.registry.missing_required(&call.name, &call.args);
        let result = if !missing.is_empty() {
            ToolResult::failure(
                call.name.clone(),
                format!("missing required argument(s): {}", missing.join(", ")),
                start.elapsed(),
            )
        } else {
            match self.registry.invoke(&call.name, context, &call.args) {
                Some(Ok(output)) => ToolResult::success(call.name.clone(), output, start.elapsed()),
                Some(Err(e)) => ToolResult::failure(call.name.clone(), e.to_string(), start.elapsed()),
                None => ToolResult::failure(
                    call.name.clone(),
                    format!("unknown function: {}", call.name),
                    start.elapsed(),
                ),
            }
        };

        if let Some(error) = &result.error {
            warn!(tool = %call.name, %error, "tool call failed");
        }
        self.stats.record(&result);
        result
    }

    /// Conversation so far
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Forget the conversation
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Get registry reference
    pub fn registry(&self) -> &ToolRegistry<C> {
        &self.registry
    }

    /// Execution statistics
    pub fn stats(&self) -> &ToolStats {
        &self.stats
    }
}
