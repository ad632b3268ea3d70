//! GeminiBuddy - Terminal assistants over the Gemini API
//!
//! A handful of small assistants sharing one provider layer and one REPL.
//!
//! # Architecture
//!
//! - **Providers**: Gemini embeddings, generation and model listing behind traits
//! - **RAG**: FAQ retrieval with cosine ranking, model rerank and grounded answers
//! - **Tools**: function-calling dispatcher with pet, light and ontology tools
//! - **Intent**: model-mapped intents for the traffic and home assistants
//! - **Ontology**: YAML stores for vehicles/owners and home theater devices
//! - **Recap**: structured meeting summaries

pub mod errors;
pub mod providers;

// Re-export commonly used types
pub use errors::{BuddyError, Result};

// Assistants
pub mod rag;
pub mod tools;
pub mod intent;
pub mod ontology;
pub mod recap;

// Terminal interface
pub mod cli;
pub mod repl;

// Shared scenario logic for CLI and REPL
pub mod execution;
