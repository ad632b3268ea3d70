//! Command-line argument parsing for GeminiBuddy
//!
//! Provides clap-based CLI with one subcommand per scenario and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::ontology::LicenseStatus;

/// GeminiBuddy - FAQ answers, tool calling and intent mapping on the Gemini API
#[derive(Parser, Debug)]
#[command(name = "geminibuddy")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Retrieval, tool calling and intent mapping over the Gemini API", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer questions from the FAQ file (interactive without a question)
    Ask {
        /// Question to answer
        #[arg(value_name = "QUESTION")]
        question: Option<String>,

        /// FAQ file (overrides config)
        #[arg(long)]
        faq: Option<PathBuf>,

        /// Passages used for the answer (overrides config)
        #[arg(long)]
        top_k: Option<usize>,

        /// Skip the model reranking stage
        #[arg(long)]
        no_rerank: bool,
    },

    /// Chat that remembers your dog's name
    Pets,

    /// Chat that switches a light on and off
    Lights,

    /// Traffic assistant over the vehicle ontology
    Traffic {
        /// Map each question to a JSON intent instead of letting the model call tools
        #[arg(long)]
        intent: bool,

        /// Put the plate's ontology facts in the prompt and let the model reason over them
        #[arg(long, conflicts_with = "intent")]
        facts: bool,
    },

    /// Rule-based violation lookup without a model
    Lookup {
        /// Question containing a plate, e.g. "ABC123 違規了嗎？"
        #[arg(value_name = "QUESTION")]
        question: Option<String>,
    },

    /// Edit or inspect the vehicle ontology
    Ontology {
        #[command(subcommand)]
        command: OntologyCommand,
    },

    /// Home theater assistant
    Home {
        /// Print the current device states and exit
        #[arg(long)]
        status: bool,
    },

    /// Summarise a meeting transcript into JSON
    Recap {
        /// Transcript file (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output file
        #[arg(long, default_value = crate::recap::DEFAULT_RECAP_OUTPUT)]
        output: PathBuf,
    },

    /// List models that support content generation
    Models,
}

/// Ontology event input
#[derive(Subcommand, Debug)]
pub enum OntologyCommand {
    /// Register a vehicle
    AddVehicle {
        plate: String,

        /// Vehicle type (car, motorcycle, truck, ...)
        #[arg(long = "type", value_name = "TYPE")]
        vehicle_type: String,

        /// License status
        #[arg(long, default_value = "valid")]
        status: LicenseStatus,

        /// Owner name
        #[arg(long)]
        owner: Option<String>,
    },

    /// Change a license status
    UpdateLicense {
        plate: String,
        status: LicenseStatus,
    },

    /// Register an owner
    AddOwner {
        name: String,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// List every vehicle and its status
    List,

    /// Show the facts of one vehicle
    Show { plate: String },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Whether the command talks to the Gemini API
    pub fn needs_api_key(&self) -> bool {
        !matches!(
            self.command,
            Commands::Lookup { .. } | Commands::Ontology { .. } | Commands::Home { status: true }
        )
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default tracing filter for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show retrieval stage details
    pub fn show_stages(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
