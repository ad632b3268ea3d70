//! Tool calling
//!
//! Lets the model request local operations by name:
//! - Declarations and results (`types`)
//! - Name to handler table over a caller-owned context (`registry`)
//! - Conversation state machine that executes requested calls (`executor`)
//! - The pet, light and traffic tool sets (`implementations`)

pub mod types;
pub mod registry;
pub mod executor;
pub mod implementations;

// Re-export commonly used types
pub use types::{ToolResult, ToolSchema, ToolStats};
pub use registry::{string_arg, ToolHandler, ToolRegistry};
pub use executor::{DispatchState, ToolDispatcher, ToolInvocation, TurnReport, DEFAULT_MAX_TOOL_ROUNDS};
