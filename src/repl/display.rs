//! Display manager for REPL terminal UI
//!
//! Color-coded replies, tool calls, retrieval stages and errors, plus a
//! spinner for slow remote calls.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::ontology::AgentState;
use crate::rag::{RagAnswer, Retrieval};
use crate::tools::TurnReport;

/// Characters of a passage shown in stage listings
const PREVIEW_CHARS: usize = 60;

/// Display manager for REPL UI
pub struct DisplayManager {
    update_interval: Duration,
    show_stages: bool,
}

impl DisplayManager {
    /// Create new display manager
    pub fn new() -> Self {
        DisplayManager {
            update_interval: Duration::from_millis(100),
            show_stages: false,
        }
    }

    /// Also print similarity and rerank scores
    pub fn with_stages(mut self, show: bool) -> Self {
        self.show_stages = show;
        self
    }

    /// Show welcome banner
    pub fn show_banner(&self, title: &str, model: &str, hint: &str) {
        let width = 64;
        println!("\n{}", "=".repeat(width).cyan());
        println!("{}", format!("  {}", title).bold().cyan());
        println!("{}", format!("  Model: {}", model).dimmed());
        println!("{}\n", "=".repeat(width).cyan());
        if !hint.is_empty() {
            println!("{}", hint.dimmed());
        }
        println!("Type {} to quit\n", "exit".green());
    }

    /// Spinner for a slow remote call
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.update_interval);
        pb
    }

    /// Model reply
    pub fn show_reply(&self, reply: &str) {
        println!("{} {}", "🤖".bold(), reply.trim());
    }

    /// Tool calls made during a turn, then the reply
    pub fn show_turn(&self, report: &TurnReport) {
        for invocation in &report.invocations {
            let args = serde_json::Value::Object(invocation.call.args.clone());
            let status = if invocation.result.success {
                "ok".green()
            } else {
                "error".red()
            };
            println!(
                "{} {}({}) {} {}",
                "🔧".bold(),
                invocation.call.name.yellow(),
                args,
                status,
                format!("({}ms)", invocation.result.duration_ms).dimmed()
            );
        }
        self.show_reply(&report.reply);
    }

    /// Retrieval stages
    pub fn show_retrieval(&self, retrieval: &Retrieval) {
        if !self.show_stages {
            return;
        }

        println!("{}", "Stage 1: embedding similarity".bold());
        for (rank, candidate) in retrieval.candidates.iter().enumerate() {
            println!(
                "  #{} {:.3} → {}",
                rank + 1,
                candidate.score,
                candidate.document.preview(PREVIEW_CHARS).dimmed()
            );
        }

        if retrieval.passages.iter().any(|p| p.rerank_score.is_some()) {
            println!("{}", "Stage 2: model rerank".bold());
            for (rank, passage) in retrieval.passages.iter().enumerate() {
                println!(
                    "  #{} {:.0} pts → {}",
                    rank + 1,
                    passage.rerank_score.unwrap_or_default(),
                    passage.document.preview(PREVIEW_CHARS).dimmed()
                );
            }
        }
    }

    /// Retrieval stages, then the answer
    pub fn show_answer(&self, answer: &RagAnswer) {
        self.show_retrieval(&answer.retrieval);
        self.show_reply(&answer.answer);
    }

    /// Home assistant state after a turn
    pub fn show_agent_state(&self, state: AgentState) {
        println!("{}", format!("🔄 [state] {}", state).dimmed());
    }

    /// Informational line
    pub fn show_info(&self, message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Success line
    pub fn show_success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Warning line
    pub fn show_warning(&self, message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Error line
    pub fn show_error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message.red());
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}
