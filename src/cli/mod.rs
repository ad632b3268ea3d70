//! CLI module for GeminiBuddy
//!
//! Handles command-line argument parsing and configuration management.

pub mod config;
pub mod args;

pub use config::{load_api_key, Config};
pub use args::{Args, Commands, OntologyCommand, Verbosity};
