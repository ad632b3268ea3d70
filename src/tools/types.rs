//! Tool declaration and execution types

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Result of one local tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool name that was requested
    pub tool: String,

    /// Structured payload returned to the model
    pub output: Value,

    /// Whether execution was successful
    pub success: bool,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Optional error message if failed
    pub error: Option<String>,
}

impl ToolResult {
    /// Create successful result
    pub fn success(tool: String, output: Value, duration: Duration) -> Self {
        Self {
            tool,
            output,
            success: true,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    /// Create failed result; the payload tells the model what went wrong
    pub fn failure(tool: String, error: String, duration: Duration) -> Self {
        Self {
            tool,
            output: json!({ "status": "error", "message": error }),
            success: false,
            duration_ms: duration.as_millis() as u64,
            error: Some(error),
        }
    }
}

/// Function declaration sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Parameter schema (JSON-Schema-like object)
    pub parameters: Value,
}

impl ToolSchema {
    /// Create new tool schema
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Schema for a tool without arguments
    pub fn no_args(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, json!({ "type": "object", "properties": {} }))
    }

    /// Keys listed under `required`
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether any property is declared
    pub fn has_parameters(&self) -> bool {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| !props.is_empty())
            .unwrap_or(false)
    }
}

/// Tool execution statistics
#[derive(Debug, Clone, Default)]
pub struct ToolStats {
    /// Total executions
    pub total_executions: u64,

    /// Successful executions
    pub successful_executions: u64,

    /// Failed executions
    pub failed_executions: u64,

    /// Total execution time (ms)
    pub total_duration_ms: u64,
}

impl ToolStats {
    /// Record an execution outcome
    pub fn record(&mut self, result: &ToolResult) {
        self.total_executions += 1;
        self.total_duration_ms += result.duration_ms;
        if result.success {
            self.successful_executions += 1;
        } else {
            self.failed_executions += 1;
        }
    }

    /// Calculate success rate
    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.successful_executions as f64 / self.total_executions as f64
        }
    }
}
